use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    datatalk::app::run().await
}
