//! MQTT bridge for text commands.
//!
//! Tasmota-style topics: a message on `cmnd/<topic>/<command>` runs
//! `<command>` with the payload as data, and the JSON result is published to
//! `stat/<topic>/RESULT`.
//!
//! ```text
//! cmnd/govee/power    "toggle"   ->  stat/govee/RESULT  {"Power":false}
//! cmnd/govee/color3   "#ff8000"  ->  stat/govee/RESULT  {"Color":"#FF8000"}
//! ```
//!
//! The MQTT client reconnects on its own; the bridge stops when the light's
//! link is lost or on Ctrl-C.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use govee_cli::config::MqttConfig;
use govee_cli::{Config, handle_command};
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cli::DeviceArgs;
use crate::util::{command_timeout, connect_light};

/// Topics derived from the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Topics {
    /// Prefix stripped from incoming topics to get the command name.
    prefix: String,
    /// Subscription filter.
    filter: String,
    /// Where results go.
    result: String,
}

impl Topics {
    fn new(config: &MqttConfig) -> Self {
        let topic = sanitize_topic_segment(&config.topic);
        let prefix = format!("{}/{}/", config.command, topic);
        Self {
            filter: format!("{prefix}+"),
            result: format!("{}/{}/{}", config.stat, topic, config.result),
            prefix,
        }
    }

    fn command<'a>(&self, topic: &'a str) -> Option<&'a str> {
        topic.strip_prefix(&self.prefix).filter(|c| !c.is_empty())
    }
}

pub async fn cmd_bridge(
    args: &DeviceArgs,
    broker: Option<String>,
    topic: Option<String>,
    config: &Config,
) -> Result<()> {
    let mut mqtt = config.mqtt.clone();
    if let Some(broker) = broker {
        mqtt.broker = broker;
    }
    if let Some(topic) = topic {
        mqtt.topic = topic;
    }

    let (host, port, use_tls) =
        parse_broker_url(&mqtt.broker).map_err(|e| anyhow!("Invalid MQTT broker URL: {}", e))?;

    let light = connect_light(args, config).await?;
    let limit = command_timeout(config);

    let mut options = MqttOptions::new(&mqtt.client_id, host, port);
    options.set_keep_alive(Duration::from_secs(mqtt.keep_alive));
    if let (Some(username), Some(password)) = (&mqtt.username, &mqtt.password) {
        options.set_credentials(username, password);
    }
    if use_tls {
        options.set_transport(rumqttc::Transport::tls_with_default_config());
    }
    let qos = qos(mqtt.qos);

    let topics = Topics::new(&mqtt);
    let (client, mut eventloop) = AsyncClient::new(options, 100);
    let (tx, mut rx) = mpsc::channel::<(String, String)>(32);
    let cancel = CancellationToken::new();

    let poll_client = client.clone();
    let filter = topics.filter.clone();
    let poll_cancel = cancel.clone();
    let poller = tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                _ = poll_cancel.cancelled() => break,
                event = eventloop.poll() => event,
            };
            match event {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    info!("MQTT connected: {:?}", ack);
                    if let Err(e) = poll_client.try_subscribe(filter.as_str(), qos) {
                        warn!("Failed to subscribe to {}: {}", filter, e);
                    }
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let payload = String::from_utf8_lossy(&publish.payload).into_owned();
                    if tx.send((publish.topic, payload)).await.is_err() {
                        break;
                    }
                }
                Ok(Event::Incoming(Packet::PingResp)) => {
                    debug!("MQTT ping response received");
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("MQTT connection error: {}. Reconnecting...", e);
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            }
        }
    });

    info!(
        "Bridging {} on {} to {}",
        light.name(),
        mqtt.broker,
        topics.filter
    );

    let mut link_check = tokio::time::interval(Duration::from_secs(5));
    let outcome = loop {
        let (topic, payload) = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Bridge received stop signal");
                break Ok(());
            }
            _ = link_check.tick() => {
                if !light.is_connected() {
                    break Err(anyhow!("Light disconnected"));
                }
                continue;
            }
            message = rx.recv() => match message {
                Some(message) => message,
                None => break Err(anyhow!("MQTT event loop stopped")),
            },
        };

        let Some(command) = topics.command(&topic) else {
            debug!("Ignoring message on {}", topic);
            continue;
        };
        let result = handle_command(&light, command, &payload, limit).await;
        if let Err(e) = client
            .publish(topics.result.as_str(), qos, false, result.to_string())
            .await
        {
            warn!("Failed to publish result: {}", e);
        }
    };

    cancel.cancel();
    if let Err(e) = client.disconnect().await {
        debug!("Error disconnecting MQTT client: {}", e);
    }
    poller.abort();
    light.disconnect().await.context("Failed to disconnect")?;
    info!("Bridge stopped");
    outcome
}

fn qos(level: u8) -> QoS {
    match level {
        0 => QoS::AtMostOnce,
        1 => QoS::AtLeastOnce,
        _ => QoS::ExactlyOnce,
    }
}

/// Parse an MQTT broker URL into host, port, and TLS flag.
///
/// Supports `mqtt://host:port` and `mqtts://host:port` formats.
fn parse_broker_url(url: &str) -> Result<(String, u16, bool), String> {
    let (use_tls, rest) = if let Some(stripped) = url.strip_prefix("mqtt://") {
        (false, stripped)
    } else if let Some(stripped) = url.strip_prefix("mqtts://") {
        (true, stripped)
    } else {
        return Err("Invalid scheme: URL must start with mqtt:// or mqtts://".to_string());
    };

    let default_port = if use_tls { 8883 } else { 1883 };
    let (host, port) = match rest.rsplit_once(':') {
        Some((h, p)) => {
            let port = p
                .parse::<u16>()
                .map_err(|_| format!("Invalid port: {}", p))?;
            (h.to_string(), port)
        }
        None => (rest.to_string(), default_port),
    };

    if host.is_empty() {
        return Err("Host cannot be empty".to_string());
    }
    Ok((host, port, use_tls))
}

/// Replace characters that are not allowed in a single topic segment.
fn sanitize_topic_segment(s: &str) -> String {
    s.replace(['#', '+', ' ', '/'], "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_broker_url() {
        assert_eq!(
            parse_broker_url("mqtt://localhost:1883").unwrap(),
            ("localhost".to_string(), 1883, false)
        );
        assert_eq!(
            parse_broker_url("mqtts://broker.example.com").unwrap(),
            ("broker.example.com".to_string(), 8883, true)
        );
        assert_eq!(
            parse_broker_url("mqtt://theseus.home.arpa").unwrap(),
            ("theseus.home.arpa".to_string(), 1883, false)
        );
    }

    #[test]
    fn test_parse_broker_url_errors() {
        assert!(parse_broker_url("http://localhost").is_err());
        assert!(parse_broker_url("mqtt://localhost:port").is_err());
        assert!(parse_broker_url("mqtt://:1883").is_err());
    }

    #[test]
    fn test_sanitize_topic_segment() {
        assert_eq!(sanitize_topic_segment("living room/#1+"), "living_room__1_");
    }

    #[test]
    fn test_topics() {
        let topics = Topics::new(&MqttConfig::default());
        assert_eq!(topics.filter, "cmnd/govee/+");
        assert_eq!(topics.result, "stat/govee/RESULT");
        assert_eq!(topics.command("cmnd/govee/power"), Some("power"));
        assert_eq!(topics.command("cmnd/govee/"), None);
        assert_eq!(topics.command("cmnd/other/power"), None);
    }

    #[test]
    fn test_qos() {
        assert_eq!(qos(0), QoS::AtMostOnce);
        assert_eq!(qos(1), QoS::AtLeastOnce);
        assert_eq!(qos(7), QoS::ExactlyOnce);
    }
}
