use serde::Serialize;

/// A navigation entry gated by a permission slug.
#[derive(Debug, Clone, Serialize)]
pub struct MenuItem {
    pub label: &'static str,
    pub path: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<&'static str>,
    pub permission: &'static str,
}

/// The full navigation tree. `/me/menu` filters this against the
/// caller's effective permission set.
pub const MENU: &[MenuItem] = &[
    MenuItem {
        label: "Dashboard",
        path: "/dashboard",
        icon: Some("dashboard"),
        permission: "menu:dashboard",
    },
    MenuItem {
        label: "Inscripciones",
        path: "/inscripciones",
        icon: Some("assignment"),
        permission: "menu:inscripciones",
    },
    MenuItem {
        label: "Matrículas",
        path: "/matriculas",
        icon: Some("school"),
        permission: "menu:matriculas",
    },
    MenuItem {
        label: "Asistencia",
        path: "/asistencia",
        icon: Some("event_available"),
        permission: "menu:asistencia",
    },
    MenuItem {
        label: "Reportes",
        path: "/reportes",
        icon: Some("bar_chart"),
        permission: "menu:reportes",
    },
    MenuItem {
        label: "Estadísticas",
        path: "/estadisticas",
        icon: Some("insights"),
        permission: "menu:estadisticas",
    },
    MenuItem {
        label: "Administración",
        path: "/administracion",
        icon: Some("admin_panel_settings"),
        permission: "menu:administracion",
    },
    MenuItem {
        label: "Usuarios",
        path: "/administracion/usuarios",
        icon: Some("people"),
        permission: "menu:usuarios",
    },
    MenuItem {
        label: "Roles",
        path: "/administracion/roles",
        icon: Some("badge"),
        permission: "menu:roles",
    },
    MenuItem {
        label: "Permisos",
        path: "/administracion/permisos",
        icon: Some("lock"),
        permission: "menu:permisos",
    },
    MenuItem {
        label: "Configuración",
        path: "/configuracion",
        icon: Some("settings"),
        permission: "menu:configuracion",
    },
];
