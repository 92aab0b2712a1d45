use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    video_saver_lib::run().await
}
