use clap::Parser;
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LinesCodec};

#[derive(Parser, Debug)]
#[command(name = "submit-job")]
#[command(about = "Submit a job to a bidbroker and wait for its result")]
struct Args {
    /// Broker address
    #[arg(long, default_value = "127.0.0.1:7171")]
    addr: String,

    /// Job topic
    #[arg(short, long)]
    topic: String,

    /// Job payload (raw JSON)
    #[arg(short, long, default_value = "null")]
    payload: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let payload: serde_json::Value = serde_json::from_str(&args.payload)?;
    let stream = TcpStream::connect(&args.addr).await?;
    let mut framed = Framed::new(stream, LinesCodec::new());

    framed
        .send(
            json!({
                "type": "SUBMIT",
                "id": "cli-1",
                "topic": args.topic,
                "payload": payload,
            })
            .to_string(),
        )
        .await?;

    while let Some(line) = framed.next().await {
        let frame: serde_json::Value = serde_json::from_str(&line?)?;
        match frame["type"].as_str() {
            Some("SUBMIT_ACK") => {
                println!("Submitted. Server job id: {}", frame["id"]);
            }
            Some("JOB_SUCCESS") => {
                println!("Success: {}", frame["value"]);
                break;
            }
            Some("JOB_FAILURE") => {
                println!("Failure: {}", frame["reason"]);
                break;
            }
            _ => {}
        }
    }

    Ok(())
}
