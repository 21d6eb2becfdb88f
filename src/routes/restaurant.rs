//! Built-in route tree of the restaurant client.
//!
//! One layout per role, each gated on `requiresAuth` plus the matching role,
//! and a login layout that also serves as the catch-all.

use super::RouteRecord;
use crate::user::role;

fn login_layout(path: &str) -> RouteRecord {
    RouteRecord::new(path).view("LoginLayout").children(vec![
        RouteRecord::new("").redirect(super::LOGIN_PATH),
        RouteRecord::new("login").view("LoginPage"),
    ])
}

#[must_use]
pub fn routes() -> Vec<RouteRecord> {
    vec![
        login_layout("/"),
        RouteRecord::new("/administrador")
            .view("AdminLayout")
            .requires_auth(true)
            .role(role::ADMINISTRADOR)
            .children(vec![
                RouteRecord::new("").view("admin/DashboardPage"),
                RouteRecord::new("empleados").view("admin/GestionEmpleados"),
                RouteRecord::new("platos").view("admin/GestionPlatos"),
                RouteRecord::new("bebidas").view("admin/GestionBebidas"),
                RouteRecord::new("mesas").view("admin/GestionMesas"),
                RouteRecord::new("reporteplatos").view("admin/ReportePlatos"),
                RouteRecord::new("reportebebidas").view("admin/ReporteBebidas"),
            ]),
        RouteRecord::new("/mesero")
            .view("MeseroLayout")
            .requires_auth(true)
            .role(role::MESERO)
            .children(vec![RouteRecord::new("").view("mesero/MesasPage")]),
        RouteRecord::new("/chef")
            .view("ChefLayout")
            .requires_auth(true)
            .role(role::CHEF)
            .children(vec![RouteRecord::new("").view("chef/CocinaPage")]),
        login_layout("/:catchAll(.*)*"),
    ]
}
