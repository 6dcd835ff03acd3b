//! Switchboard demo - wires the message loops together from the command line

mod cli;

use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use switchboard_core::{json, Message, Queue};
use switchboard_fabric::codec::JsonCodec;
use switchboard_fabric::request::request;
use switchboard_fabric::Endpoint;
use switchboard_loops::{
    launch, request_loop, BoxError, LaunchConfig, PredictionHandler, PublishRelay, Reply,
    ReplyServer, ReplyServerConfig, SubscribeRelay, SubscribeRelayConfig, Target,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};

fn setup_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli.log_level);
    debug!(command = ?cli.command, "Dispatching command");

    match cli.command {
        Command::LoopTest {
            port,
            count,
            timeout_ms,
        } => loop_test(port, count, Duration::from_millis(timeout_ms)).await,
        Command::Predict { port, timeout_ms } => {
            predict(port, Duration::from_millis(timeout_ms)).await
        }
        Command::Quit { host, port } => quit(Endpoint::tcp(host, port)).await,
        Command::Pubsub { port, topic, count } => pubsub(port, topic, count).await,
        Command::Launch {
            script,
            interpreter,
            port,
            timeout,
            elevate,
            args,
        } => {
            let mut config = LaunchConfig::new(script)
                .with_interpreter(interpreter)
                .with_timeout(Duration::from_secs(timeout))
                .elevated(elevate);
            if let Some(port) = port {
                config = config.with_args(["--port".to_string(), port.to_string()]);
            }
            let outcome = launch(&config.with_args(args)).await?;
            println!("{:?}", outcome);
            Ok(())
        }
    }
}

/// Echo server plus request loop, fed one request at a time
async fn loop_test(port: u16, count: u32, timeout: Duration) -> Result<()> {
    let config = ReplyServerConfig::default().receive_timeout(timeout);
    let server = ReplyServer::bind(&Endpoint::bind_port(port), config)
        .await
        .context("Failed to bind echo server")?;
    let shutdown = server.shutdown_token();
    let serving = tokio::spawn(server.serve(
        |request: Message| -> std::result::Result<Reply, BoxError> {
            debug!(%request, "Echo server got request");
            Ok(Reply::Respond(json!({"response": "OK"})))
        },
    ));

    let inbound = Queue::bounded(16)?;
    let outbound = Queue::bounded(16)?;
    let looping = tokio::spawn({
        let (inbound, outbound) = (inbound.clone(), outbound.clone());
        async move { request_loop::run(&Endpoint::connect_port(port), inbound, outbound).await }
    });

    for i in 0..count {
        inbound.put(json!({"test": i})).await?;
        let response = outbound.get().await?;
        println!("{}", response);
    }

    looping.abort();
    shutdown.cancel();
    let stopped = serving.await??;
    info!(?stopped, "Loop test finished");
    Ok(())
}

/// Pressure-weighted centroid of `(x, y, pressure)` triples
fn centroid(features: &[f32]) -> std::result::Result<Target, BoxError> {
    let points: Vec<(f64, f64, f64)> = features
        .chunks_exact(3)
        .map(|p| (p[0] as f64, p[1] as f64, p[2] as f64))
        .collect();

    let total: f64 = points.iter().map(|&(_, _, p)| p).sum();
    if total <= 0.0 {
        return Err("touch sample carries no pressure".into());
    }

    let x = points.iter().map(|&(x, _, p)| x * p).sum::<f64>() / total;
    let y = points.iter().map(|&(_, y, p)| y * p).sum::<f64>() / total;
    let spread = points
        .iter()
        .map(|&(px, py, p)| p * ((px - x).powi(2) + (py - y).powi(2)))
        .sum::<f64>()
        / total;

    Ok(Target {
        x,
        y,
        radius: spread.sqrt(),
    })
}

async fn predict(port: u16, timeout: Duration) -> Result<()> {
    let config = ReplyServerConfig::default().receive_timeout(timeout);
    let server = ReplyServer::bind(&Endpoint::bind_port(port), config)
        .await
        .context("Failed to bind prediction server")?;

    let shutdown = server.shutdown_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, stopping at next receive timeout");
            shutdown.cancel();
        }
    });

    let stopped = server.serve(PredictionHandler::new(centroid)).await?;
    info!(?stopped, "Prediction server stopped");
    Ok(())
}

async fn quit(endpoint: Endpoint) -> Result<()> {
    let sent: switchboard_fabric::Result<Message> =
        request(&endpoint, &json!({"quit": true}), JsonCodec).await;
    match sent {
        Ok(reply) => println!("{}", reply),
        // A terminating server hangs up instead of replying
        Err(switchboard_fabric::Error::ConnectionClosed) => info!(%endpoint, "Server stopped"),
        Err(e) => return Err(e).context("Quit request failed"),
    }
    Ok(())
}

async fn pubsub(port: u16, topic: String, count: u32) -> Result<()> {
    let relay = PublishRelay::bind(&Endpoint::bind_port(port), topic.clone()).await?;

    let incoming = Queue::bounded(16)?;
    let sub = SubscribeRelay::connect(
        &Endpoint::connect_port(port),
        topic,
        SubscribeRelayConfig::default(),
    )
    .await?;
    let receiving = tokio::spawn(sub.run(incoming.clone()));

    tokio::time::timeout(Duration::from_secs(5), async {
        while relay.subscriber_count() == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .context("Subscriber never registered")?;

    let outgoing = Queue::bounded(16)?;
    let publishing = tokio::spawn(relay.run(outgoing.clone()));

    for seq in 0..count {
        outgoing.put(json!({"seq": seq})).await?;
        let message = tokio::time::timeout(Duration::from_secs(5), incoming.get())
            .await
            .context("Timed out waiting for published message")??;
        println!("{}", message);
    }

    publishing.abort();
    receiving.abort();
    if !incoming.is_empty() {
        bail!("{} unexpected messages left over", incoming.len());
    }
    Ok(())
}
