use std::process;

#[tokio::main]
async fn main() {
    if let Err(error) = flowcanvas_rs_lib::run().await {
        eprintln!("Error: {error:#}");
        process::exit(1);
    }
}
