use crate::config::Config;
use crate::error::{Error, Result};
use bytes::Bytes;
use rumqttc::{
    AsyncClient, ConnectReturnCode, ConnectionError, Event, EventLoop, Outgoing, Packet, QoS,
    SubscribeReasonCode,
};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, info, trace, warn};

/// Capacity of the request channel between the client handle and its event loop.
const REQUEST_CHANNEL_CAPACITY: usize = 10;

/// Pause after a failed poll before the event loop reconnects.
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Upper bound on waiting for DISCONNECT to be written during shutdown.
const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// A message received from the broker.
#[derive(Debug, Clone)]
pub struct Message {
    /// Topic the message was published on
    pub topic: String,
    /// Raw payload
    pub payload: Bytes,
}

/// Lifecycle of the broker connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Disconnected,
    Connecting,
    Connected,
    Subscribed,
    Disconnecting,
}

/// Subscription to every message heard by one receiving station.
pub struct Client {
    client: AsyncClient,
    eventloop: EventLoop,
    broker: String,
    filter: String,
    state: State,
}

impl Client {
    fn new(config: &Config, callsign: &str) -> Result<Self> {
        let options = config.mqtt_options()?;
        let (client, eventloop) = AsyncClient::new(options, REQUEST_CHANNEL_CAPACITY);

        Ok(Self {
            client,
            eventloop,
            broker: format!("{}:{}", config.host, config.port),
            filter: config.subscription_filter(callsign),
            state: State::Disconnected,
        })
    }

    /// Connect to the broker and subscribe to `callsign`'s topics.
    ///
    /// Any failure before the broker acknowledges the connection is returned
    /// as an error; there is no retry at this stage.
    pub async fn connect(config: &Config, callsign: &str) -> Result<Self> {
        let mut this = Self::new(config, callsign)?;

        this.transition(State::Connecting);
        this.wait_for_connack().await?;
        this.transition(State::Connected);
        info!("Connected to MQTT broker at {}", this.broker);

        this.subscribe()?;
        Ok(this)
    }

    /// Deliver messages to `handler` until `shutdown` fires, then disconnect.
    ///
    /// Errors while running are logged; the event loop reconnects on the
    /// next poll and the subscription is renewed when the broker accepts
    /// the new connection.
    pub async fn run<F>(&mut self, mut handler: F, mut shutdown: broadcast::Receiver<()>) -> Result<()>
    where
        F: FnMut(Message),
    {
        info!("Waiting for messages... (Press Ctrl+C to stop)");

        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    info!("Received shutdown signal");
                    break;
                }
                event = self.eventloop.poll() => match event {
                    Ok(event) => self.on_event(event, &mut handler),
                    Err(e) => {
                        error!("MQTT connection error: {e}");
                        self.transition(State::Connecting);
                        if shutdown_within(&mut shutdown, RECONNECT_DELAY).await {
                            info!("Received shutdown signal");
                            break;
                        }
                    }
                },
            }
        }

        self.disconnect().await;
        Ok(())
    }

    fn on_event<F>(&mut self, event: Event, handler: &mut F)
    where
        F: FnMut(Message),
    {
        match event {
            Event::Incoming(Packet::Publish(publish)) => {
                debug!(
                    "Received {} bytes on {}",
                    publish.payload.len(),
                    publish.topic
                );
                handler(Message {
                    topic: publish.topic,
                    payload: publish.payload,
                });
            }
            Event::Incoming(Packet::ConnAck(_)) => {
                self.transition(State::Connected);
                info!("Reconnected to MQTT broker at {}", self.broker);
                if let Err(e) = self.subscribe() {
                    error!("Failed to renew subscription: {e}");
                }
            }
            Event::Incoming(Packet::SubAck(ack)) => {
                if ack
                    .return_codes
                    .iter()
                    .any(|code| matches!(code, SubscribeReasonCode::Failure))
                {
                    error!("Broker rejected subscription to {}", self.filter);
                } else {
                    self.transition(State::Subscribed);
                    info!("Subscribed to topic: {}", self.filter);
                }
            }
            event => trace!("MQTT event: {event:?}"),
        }
    }

    async fn wait_for_connack(&mut self) -> Result<()> {
        loop {
            match self.eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    return match ack.code {
                        ConnectReturnCode::Success => Ok(()),
                        code => Err(Error::ConnectionRefused(code)),
                    };
                }
                Ok(event) => trace!("MQTT event while connecting: {event:?}"),
                Err(ConnectionError::ConnectionRefused(code)) => {
                    return Err(Error::ConnectionRefused(code));
                }
                Err(source) => {
                    return Err(Error::Connection {
                        broker: self.broker.clone(),
                        source,
                    });
                }
            }
        }
    }

    /// Queue a SUBSCRIBE without awaiting channel capacity.
    fn subscribe(&self) -> Result<()> {
        self.client.try_subscribe(self.filter.as_str(), QoS::AtMostOnce)?;
        Ok(())
    }

    async fn disconnect(&mut self) {
        self.transition(State::Disconnecting);
        info!("Disconnecting from MQTT broker...");

        if let Err(e) = self.client.disconnect().await {
            warn!("Failed to request disconnect: {e}");
        } else {
            let eventloop = &mut self.eventloop;
            let drained = tokio::time::timeout(DISCONNECT_TIMEOUT, async {
                loop {
                    match eventloop.poll().await {
                        Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => break,
                        // Publishes still in flight are not handed out after shutdown
                        Ok(_) => continue,
                    }
                }
            })
            .await;
            if drained.is_err() {
                warn!("Timed out waiting for the broker connection to close");
            }
        }

        self.transition(State::Disconnected);
        info!("Disconnected.");
    }

    fn transition(&mut self, next: State) {
        if self.state != next {
            debug!("MQTT client state: {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }
}

/// Sleep for `delay`; `true` if shutdown was requested first.
async fn shutdown_within(shutdown: &mut broadcast::Receiver<()>, delay: Duration) -> bool {
    tokio::select! {
        biased;
        _ = shutdown.recv() => true,
        _ = tokio::time::sleep(delay) => false,
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("broker", &self.broker)
            .field("filter", &self.filter)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
