use std::collections::HashMap;

use clap::Parser;
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LinesCodec};

#[derive(Parser, Debug)]
#[command(name = "worker")]
#[command(about = "Bid on every job a bidbroker announces and echo the payload back")]
struct Args {
    /// Broker address
    #[arg(long, default_value = "127.0.0.1:7171")]
    addr: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let stream = TcpStream::connect(&args.addr).await?;
    let mut framed = Framed::new(stream, LinesCodec::new());
    println!("Connected to {}, waiting for jobs", args.addr);

    // Payloads of announced jobs, kept until we learn whether our bid won.
    let mut announced: HashMap<String, serde_json::Value> = HashMap::new();

    while let Some(line) = framed.next().await {
        let frame: serde_json::Value = serde_json::from_str(&line?)?;
        let Some(id) = frame["id"].as_str().map(str::to_string) else {
            continue;
        };

        match frame["type"].as_str() {
            Some("SUBMIT") => {
                announced.insert(id.clone(), frame["payload"].clone());
                framed
                    .send(json!({ "type": "BID", "id": id }).to_string())
                    .await?;
            }
            Some("BID_ACK") => {
                let payload = announced.remove(&id).unwrap_or(serde_json::Value::Null);
                println!("Won job {}", id);
                framed
                    .send(
                        json!({ "type": "JOB_SUCCESS", "id": id, "value": payload }).to_string(),
                    )
                    .await?;
            }
            Some("BID_REJECT") => {
                println!("Lost job {}", id);
                announced.remove(&id);
            }
            _ => {}
        }
    }

    Ok(())
}
