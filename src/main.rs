#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate tracing;

mod app;
mod cli;
mod endpoint;
mod http;
mod plugin;
mod timing;
mod tls;

#[cfg(test)]
mod test_support;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = app::run::main_with_error().await {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}
