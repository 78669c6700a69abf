use ftprep::api::start_api_server;
use ftprep::config::ApiConfig;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = ApiConfig::from_env();

    println!("📂 Dataset directory: {}", config.dataset_dir.display());
    println!("🤖 Completion model: {}", config.model);
    println!("🚀 Starting API server on http://{} ...", config.bind_addr());

    start_api_server(&config).await
}
