#[tokio::main]
async fn main() -> std::io::Result<()> {
    magic_session::run_with_config().await
}
