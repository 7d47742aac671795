#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = faqrelay_lib::run().await {
        log::error!("faqrelay stopped: {}", e);
        std::process::exit(1);
    }
}
