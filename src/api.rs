use rocket::Route;

pub(crate) mod admin;
pub(crate) mod auth;
pub(crate) mod polls;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(admin::routes());
    routes.extend(auth::routes());
    routes.extend(polls::routes());
    routes
}
