/*
 * Copyright Bret Ambrose. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

extern crate argh;
extern crate schist_mqtt;
extern crate simplelog;
extern crate tokio;
extern crate url;

use argh::FromArgs;
use schist_mqtt::*;
use schist_mqtt::features::schist_tokio::spawn_connection;
use simplelog::*;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio::sync::mpsc::unbounded_channel;
use tokio::time::{sleep, timeout};
use url::Url;

const DEFAULT_MQTT_PORT : u16 = 1883;
const KEEP_ALIVE_SECONDS : u16 = 2;
const PUBLISH_TIMEOUT : Duration = Duration::from_secs(10);
const SMOKE_TOPIC : &str = "schist/smoke";

#[derive(FromArgs, Debug, PartialEq)]
/// schist-smoke - exercises an MQTT 3.1.1 broker with publishes at every QoS level
struct CommandLineArgs {

    /// URI of endpoint to connect to.  Only the `mqtt` scheme is supported.
    #[argh(positional)]
    endpoint_uri: String,

    /// client id to connect with
    #[argh(option, default = "String::from(\"schist-smoke\")")]
    client_id: String,

    /// path to a log file that should be written
    #[argh(option)]
    logpath: Option<PathBuf>,
}

fn parse_endpoint(endpoint_uri: &str) -> Result<(String, u16), Box<dyn std::error::Error>> {
    let uri = Url::parse(endpoint_uri)?;
    if uri.scheme().to_lowercase() != "mqtt" {
        return Err(format!("unsupported scheme \"{}\"", uri.scheme()).into());
    }

    let Some(host) = uri.host_str() else {
        return Err("endpoint uri has no host".into());
    };

    Ok((host.to_string(), uri.port().unwrap_or(DEFAULT_MQTT_PORT)))
}

// a 24 byte client id must be refused before anything reaches the broker
fn check_client_id_rejection() -> Result<(), Box<dyn std::error::Error>> {
    let options = ConnectOptionsBuilder::new()
        .with_client_id(&"x".repeat(24))
        .build();

    let transport = StreamTransport::new(Vec::<u8>::new());
    match MqttConnection::connect(options, Box::new(transport), ConnectionListeners::new()) {
        Err(SchistError::ConfigurationError(_)) => {
            println!("ok: overlong client id rejected locally");
            Ok(())
        }
        Err(error) => { Err(format!("overlong client id failed with an unexpected error: {}", error).into()) }
        Ok(_) => { Err("overlong client id was accepted".into()) }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli_args: CommandLineArgs = argh::from_env();

    if let Some(log_file_path) = &cli_args.logpath {
        let log_file = File::create(log_file_path)?;

        let mut log_config_builder = simplelog::ConfigBuilder::new();
        let log_config = log_config_builder.build();
        WriteLogger::init(LevelFilter::Debug, log_config, log_file)?;
    } else {
        TermLogger::init(LevelFilter::Warn, Config::default(), TerminalMode::Mixed, ColorChoice::Auto)?;
    }

    println!("schist-smoke - MQTT 3.1.1 smoke test\n");

    check_client_id_rejection()?;

    let (host, port) = parse_endpoint(&cli_args.endpoint_uri)?;
    let stream = TcpStream::connect((host.as_str(), port)).await?;
    println!("ok: tcp connection to {}:{} established", host, port);

    let (completion_sender, mut completion_receiver) = unbounded_channel::<QualityOfService>();

    let on_connected = move |connection: &mut MqttConnection, session_present: bool| {
        println!("ok: connection accepted (session present: {})", session_present);

        for qos in [QualityOfService::AtMostOnce, QualityOfService::AtLeastOnce, QualityOfService::ExactlyOnce] {
            let sender = completion_sender.clone();
            let callback : PublishEventHandler = Arc::new(move |_: &mut MqttConnection, _: &str, _: &[u8]| {
                let _ = sender.send(qos);
            });

            let message = format!("smoke test message at {}", qos);
            if let Err(error) = connection.publish(SMOKE_TOPIC, message.as_bytes(), qos, Some(callback)) {
                println!("error: {} publish failed: {}", qos, error);
            }
        }
    };

    let on_error = |error: &SchistError| {
        println!("error: {}", error);
    };

    let listeners = ConnectionListeners::new()
        .with_on_connected(Arc::new(on_connected))
        .with_on_error(Arc::new(on_error));

    let options = ConnectOptionsBuilder::new()
        .with_client_id(&cli_args.client_id)
        .with_keep_alive_interval_seconds(KEEP_ALIVE_SECONDS)
        .build();

    let connection = spawn_connection(stream, options, listeners, &Handle::current())?;

    for _ in 0..3 {
        match timeout(PUBLISH_TIMEOUT, completion_receiver.recv()).await {
            Ok(Some(qos)) => { println!("ok: {} publish complete", qos); }
            Ok(None) => { return Err("completion channel closed".into()); }
            Err(_) => { return Err("timed out waiting for publish completion".into()); }
        }
    }

    // long enough for the keep alive task to ping at least once
    sleep(Duration::from_secs(KEEP_ALIVE_SECONDS as u64 + 1)).await;

    match connection.lock() {
        Ok(mut connection) => {
            if connection.state() != ConnectionState::Connected {
                return Err(format!("connection is {} after keep alive", connection.state()).into());
            }

            connection.disconnect()?;
        }
        Err(_) => { return Err("connection lock poisoned".into()); }
    }

    println!("ok: disconnected");

    Ok(())
}
