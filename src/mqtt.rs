//! MQTT client for receiving scroll progress
//!
//! Connects to an MQTT broker and subscribes to a topic. Each payload is
//! a bare number or `{"progress": p}`; values are forwarded to the main
//! loop, which keeps only the newest.

use rumqttc::{Client, Event, MqttOptions, Packet, QoS};
use serde::Deserialize;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 1883;
const DEFAULT_TOPIC: &str = "skyfacer/scroll";

#[derive(Deserialize)]
struct JsonMessage {
    progress: f32,
}

/// Parse a payload into a clamped progress value
fn parse_progress(payload: &[u8]) -> Option<f32> {
    let text = std::str::from_utf8(payload).ok()?.trim();
    if text.is_empty() {
        return None;
    }
    let value = match text.parse::<f32>() {
        Ok(v) => v,
        Err(_) => serde_json::from_str::<JsonMessage>(text).ok()?.progress,
    };
    value.is_finite().then(|| value.clamp(0.0, 1.0))
}

/// MQTT subscription that receives scroll progress in a background thread
pub struct ScrollFeed {
    receiver: Receiver<f32>,
    _thread: thread::JoinHandle<()>,
}

impl ScrollFeed {
    /// Connect to the broker and subscribe.
    /// Fails immediately if connection cannot be established.
    pub fn new(host: &str, topic: &str) -> Result<Self, String> {
        let host = if host.is_empty() { DEFAULT_HOST } else { host };
        let topic = if topic.is_empty() { DEFAULT_TOPIC } else { topic };

        let mut options = MqttOptions::new("skyfacer", host, DEFAULT_PORT);
        options.set_keep_alive(Duration::from_secs(30));

        let (client, mut connection) = Client::new(options, 10);

        client
            .subscribe(topic, QoS::AtMostOnce)
            .map_err(|e| format!("Failed to subscribe to topic '{}': {}", topic, e))?;

        // Poll once so an unreachable broker fails here, not in the thread
        match connection.iter().next() {
            Some(Ok(_)) => {},
            Some(Err(e)) => {
                return Err(format!(
                    "Failed to connect to MQTT broker at {}:{} - {}",
                    host, DEFAULT_PORT, e
                ));
            },
            None => {
                return Err(format!(
                    "Failed to connect to MQTT broker at {}:{} - connection closed",
                    host, DEFAULT_PORT
                ));
            },
        }

        let (sender, receiver) = mpsc::channel();
        let topic_owned = topic.to_string();

        let handle = thread::spawn(move || {
            Self::message_loop(connection, sender, &topic_owned);
        });

        info!(
            "MQTT: connected to {}:{}, subscribed to '{}'",
            host, DEFAULT_PORT, topic
        );

        Ok(Self {
            receiver,
            _thread: handle,
        })
    }

    fn message_loop(mut connection: rumqttc::Connection, sender: Sender<f32>, topic: &str) {
        for event in connection.iter() {
            match event {
                Ok(Event::Incoming(Packet::Publish(publish))) if publish.topic == topic => {
                    match parse_progress(&publish.payload) {
                        Some(progress) => {
                            if sender.send(progress).is_err() {
                                // Main loop gone
                                break;
                            }
                        },
                        None => debug!("MQTT: ignoring payload on '{}'", topic),
                    }
                },
                Ok(_) => {},
                Err(e) => {
                    // rumqttc reconnects on the next iteration
                    warn!("MQTT error: {}", e);
                },
            }
        }
    }

    /// Newest progress value since the last poll, discarding older ones
    pub fn poll(&self) -> Option<f32> {
        let mut latest = None;
        while let Ok(p) = self.receiver.try_recv() {
            latest = Some(p);
        }
        latest
    }

    pub fn default_topic() -> &'static str {
        DEFAULT_TOPIC
    }
}
