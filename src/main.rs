#[tokio::main]
async fn main() {
    if let Err(e) = bharatgpt_lib::run().await {
        eprintln!("bharatgpt: {e}");
        std::process::exit(1);
    }
}
