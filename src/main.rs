#[tokio::main]
async fn main() -> anyhow::Result<()> {
    authenex_lib::run().await
}
