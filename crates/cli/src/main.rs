use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    tablesafe_cli::run().await
}
