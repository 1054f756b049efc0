use actix_web::{web, HttpResponse, Responder};

async fn liveness() -> impl Responder {
    HttpResponse::Ok().body("Server is running!")
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(liveness)));
}
