use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;

use wireline::body::Body;
use wireline::client;
use wireline::listener::Listener;
use wireline::message::Status;
use wireline::request::Request;
use wireline::response::Response;
use wireline::router::{HandlerFuture, Router};
use wireline::server::{serve, ServeOptions};

#[derive(Parser)]
#[command(name = "wireline", version, about = "HTTP/1.1 message engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the built-in demo routes on ADDR (host:port, :port, or a
    /// Unix socket path)
    Serve {
        addr: String,
        /// Per-call I/O deadline in milliseconds
        #[arg(long, default_value_t = 5000)]
        timeout_ms: u64,
    },
    /// Fetch TARGET from a server and print the response body
    Get {
        addr: String,
        #[arg(default_value = "/hello")]
        target: String,
    },
}

#[derive(Serialize)]
struct EchoReply<'a> {
    message: &'a str,
    via: &'static str,
}

fn demo_router() -> Arc<Router> {
    let router = Router::new();

    router
        .add("hello", |_req: Request| -> HandlerFuture {
            Box::pin(async {
                Response::builder()
                    .with_status(Status::OK)
                    .header("Content-Type", "text/plain")?
                    .with_body(Body::from_string("Hello, world!\n"))
                    .build()
            })
        })
        .expect("register /hello");

    router
        .add("echo/{msg}", |req: Request| -> HandlerFuture {
            Box::pin(async move {
                let msg = req.path_param("msg").unwrap_or_default().to_string();
                let reply = EchoReply {
                    message: &msg,
                    via: "wireline",
                };
                let payload = serde_json::to_string(&reply).map_err(|err| {
                    wireline::Error::Status {
                        status: Status::INTERNAL_SERVER_ERROR,
                        reason: err.to_string(),
                    }
                })?;
                Response::builder()
                    .with_status(Status::OK)
                    .header("Content-Type", "application/json")?
                    .with_body(Body::from_string(payload))
                    .build()
            })
        })
        .expect("register /echo");

    Arc::new(router)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve { addr, timeout_ms } => {
            let listener = Listener::bind(&addr).await?;
            println!("{listener}");
            let options = ServeOptions::builder().timeout_ms(timeout_ms).build();
            serve(listener, demo_router(), options).await?;
        }
        Command::Get { addr, target } => {
            let mut resp = client::get(&addr, &target).await?;
            eprintln!("{} {}", resp.status(), resp.reason());
            if let Some(body) = resp.body_mut() {
                let data = body.read_all().await?;
                print!("{}", String::from_utf8_lossy(&data));
            }
        }
    }

    Ok(())
}
