#[actix_web::main]
async fn main() {
    if let Err(err) = csvqa_lib::run().await {
        eprintln!("csvqa: {}", err);
        std::process::exit(1);
    }
}
