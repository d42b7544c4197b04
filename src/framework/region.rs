//! # Shard Region
//!
//! Runs one task per entity and passivates the ones that go idle. Each entity has at most one
//! delivery in flight.

use crate::framework::client::RegionClient;
use crate::framework::delivery::{ConfirmTo, ConsumerEvent, ConsumerHandle, Delivery};
use crate::framework::entity::ShardedEntity;
use crate::framework::extractor::MessageExtractor;
use crate::framework::message::{RegionMessage, Response};
use crate::model::{EntityId, ShardId};
use serde::Serialize;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Capacity of each entity's inbox. An entity holds at most one delivery at a time, so
/// this only has to absorb snapshot requests and the stop signal.
const ENTITY_INBOX_SIZE: usize = 8;

/// Where a region reports that an envelope has left the pipeline, confirmed or dropped.
/// Carries the entity id when the envelope was routable.
pub type ConfirmationSink = mpsc::UnboundedSender<Option<EntityId>>;

/// Requests accepted by a [`ShardRegion`].
pub enum RegionRequest<E: ShardedEntity> {
    Route {
        message: RegionMessage<E::Command>,
        confirm_to: Option<ConfirmationSink>,
    },
    Snapshot {
        entity_id: EntityId,
        respond_to: Response<Option<E::Snapshot>>,
    },
    Stats {
        respond_to: Response<RegionStats>,
    },
}

/// Entity counts per shard.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RegionStats {
    pub shards: BTreeMap<ShardId, usize>,
}

impl RegionStats {
    pub fn entity_count(&self) -> usize {
        self.shards.values().sum()
    }
}

#[derive(Debug, Clone)]
pub struct RegionSettings {
    /// Capacity of the region's request channel.
    pub buffer_size: usize,
    /// Entities with no activity for this long are stopped.
    pub passivate_idle_after: Duration,
    /// How often idle entities are looked for.
    pub passivation_check_interval: Duration,
}

impl Default for RegionSettings {
    fn default() -> Self {
        Self {
            buffer_size: 32,
            passivate_idle_after: Duration::from_secs(60),
            passivation_check_interval: Duration::from_secs(10),
        }
    }
}

enum EntityMessage<E: ShardedEntity> {
    Deliver(Delivery<E::Command>),
    Snapshot(Response<Option<E::Snapshot>>),
    Stop,
}

struct Pending<C> {
    command: C,
    confirm_to: Option<ConfirmationSink>,
}

struct InFlight {
    seq_nr: u64,
    confirm_to: Option<ConfirmationSink>,
}

struct EntitySlot<E: ShardedEntity> {
    shard_id: ShardId,
    inbox: mpsc::Sender<EntityMessage<E>>,
    handle: JoinHandle<()>,
    pending: VecDeque<Pending<E::Command>>,
    in_flight: Option<InFlight>,
    ready: bool,
    next_seq_nr: u64,
    last_active: Instant,
}

impl<E: ShardedEntity> EntitySlot<E> {
    fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.in_flight.is_none()
    }
}

/// Hosts the entities of one type and routes messages to them.
///
/// # Architecture Note
/// Like every actor here, the region owns its state and processes requests sequentially,
/// so the entity table needs no locking. Each entity runs in its own task and talks back
/// through an unbounded event channel, which keeps the region from ever waiting on an
/// entity that is itself waiting on the region.
///
/// # Delivery Rules
/// - Entities are created lazily on the first message addressed to them.
/// - Commands for one entity are buffered and delivered one at a time: the next delivery
///   goes out only after the previous one is confirmed *and* the entity asked for more.
/// - Idle entities are passivated; their state is dropped and recreated on demand.
pub struct ShardRegion<E: ShardedEntity> {
    receiver: mpsc::Receiver<RegionRequest<E>>,
    events_tx: mpsc::UnboundedSender<ConsumerEvent>,
    events: mpsc::UnboundedReceiver<ConsumerEvent>,
    extractor: Box<dyn MessageExtractor<E::Command>>,
    settings: RegionSettings,
    entities: HashMap<EntityId, EntitySlot<E>>,
    stopping: Vec<JoinHandle<()>>,
}

impl<E: ShardedEntity> ShardRegion<E> {
    /// Creates a region and the client used to reach it. The region does nothing until
    /// [`ShardRegion::run`] is spawned.
    pub fn new(
        settings: RegionSettings,
        extractor: impl MessageExtractor<E::Command> + 'static,
    ) -> (Self, RegionClient<E>) {
        let (sender, receiver) = mpsc::channel(settings.buffer_size);
        let (events_tx, events) = mpsc::unbounded_channel();
        let region = Self {
            receiver,
            events_tx,
            events,
            extractor: Box::new(extractor),
            settings,
            entities: HashMap::new(),
            stopping: Vec::new(),
        };
        (region, RegionClient::new(sender))
    }

    /// Runs the region until every client is dropped, then stops all entities.
    pub async fn run(mut self, context: E::Context) {
        let entity_type = std::any::type_name::<E>()
            .split("::")
            .last()
            .unwrap_or("Unknown");
        info!(entity_type, "Region started");

        let mut passivation = tokio::time::interval(self.settings.passivation_check_interval);
        passivation.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                request = self.receiver.recv() => match request {
                    Some(request) => self.handle_request(request, &context).await,
                    None => break,
                },
                Some(event) = self.events.recv() => self.handle_event(event).await,
                _ = passivation.tick() => self.passivate_idle().await,
            }
        }

        let entities = self.entities.len();
        self.stop_all().await;
        info!(entity_type, entities, "Region shutdown");
    }

    async fn handle_request(&mut self, request: RegionRequest<E>, context: &E::Context) {
        match request {
            RegionRequest::Route {
                message,
                confirm_to,
            } => {
                let Some(entity_id) = self.extractor.entity_id(&message) else {
                    warn!(?message, "Unroutable message dropped");
                    release(confirm_to, None);
                    return;
                };
                let payload = self.extractor.entity_message(message);
                let slot = self.ensure_started(&entity_id, context);
                slot.last_active = Instant::now();
                match payload {
                    RegionMessage::Command(command) => {
                        slot.pending.push_back(Pending {
                            command,
                            confirm_to,
                        });
                        self.try_deliver(&entity_id).await;
                    }
                    RegionMessage::StartEntity(_) => {
                        debug!(%entity_id, "StartEntity");
                        release(confirm_to, Some(&entity_id));
                    }
                    RegionMessage::Envelope(envelope) => {
                        warn!(%entity_id, nested = %envelope.entity_id, "Nested envelope dropped");
                        release(confirm_to, Some(&entity_id));
                    }
                }
            }
            RegionRequest::Snapshot {
                entity_id,
                respond_to,
            } => match self.entities.get(&entity_id) {
                Some(slot) => {
                    // A closed inbox drops `respond_to`, which the caller sees as ActorDropped.
                    let _ = slot.inbox.send(EntityMessage::Snapshot(respond_to)).await;
                }
                None => {
                    let _ = respond_to.send(Ok(None));
                }
            },
            RegionRequest::Stats { respond_to } => {
                let mut stats = RegionStats::default();
                for slot in self.entities.values() {
                    *stats.shards.entry(slot.shard_id).or_insert(0) += 1;
                }
                let _ = respond_to.send(Ok(stats));
            }
        }
    }

    async fn handle_event(&mut self, event: ConsumerEvent) {
        match event {
            ConsumerEvent::Ready { entity_id } => {
                if let Some(slot) = self.entities.get_mut(&entity_id) {
                    slot.ready = true;
                    self.try_deliver(&entity_id).await;
                }
            }
            ConsumerEvent::Confirmed { entity_id, seq_nr } => {
                let Some(slot) = self.entities.get_mut(&entity_id) else {
                    debug!(%entity_id, seq_nr, "Confirmation from stopped entity");
                    return;
                };
                match slot.in_flight.take() {
                    Some(in_flight) if in_flight.seq_nr == seq_nr => {
                        slot.last_active = Instant::now();
                        debug!(%entity_id, seq_nr, "Confirmed");
                        release(in_flight.confirm_to, Some(&entity_id));
                        self.try_deliver(&entity_id).await;
                    }
                    other => {
                        slot.in_flight = other;
                        warn!(%entity_id, seq_nr, "Confirmation for unknown delivery");
                    }
                }
            }
            ConsumerEvent::Unconfirmed { entity_id, seq_nr } => {
                let matches = self
                    .entities
                    .get(&entity_id)
                    .and_then(|slot| slot.in_flight.as_ref())
                    .is_some_and(|in_flight| in_flight.seq_nr == seq_nr);
                if matches {
                    error!(%entity_id, seq_nr, "Protocol violation: delivery dropped without confirmation");
                    self.stop_entity(&entity_id).await;
                }
            }
        }
    }

    fn ensure_started(&mut self, entity_id: &EntityId, context: &E::Context) -> &mut EntitySlot<E> {
        let running = self.entities.len();
        match self.entities.entry(entity_id.clone()) {
            Entry::Occupied(slot) => slot.into_mut(),
            Entry::Vacant(vacant) => {
                let shard_id = self.extractor.shard_id(entity_id);
                let (inbox, receiver) = mpsc::channel(ENTITY_INBOX_SIZE);
                let consumer = ConsumerHandle::new(entity_id.clone(), self.events_tx.clone());
                let entity = E::create(entity_id.clone(), context);
                let handle = tokio::spawn(run_entity(entity, receiver, consumer));
                info!(%entity_id, %shard_id, entities = running + 1, "Entity started");
                vacant.insert(EntitySlot {
                    shard_id,
                    inbox,
                    handle,
                    pending: VecDeque::new(),
                    in_flight: None,
                    ready: false,
                    next_seq_nr: 1,
                    last_active: Instant::now(),
                })
            }
        }
    }

    async fn try_deliver(&mut self, entity_id: &EntityId) {
        let Some(slot) = self.entities.get_mut(entity_id) else {
            return;
        };
        if !slot.ready || slot.in_flight.is_some() {
            return;
        }
        let Some(pending) = slot.pending.pop_front() else {
            return;
        };

        let seq_nr = slot.next_seq_nr;
        slot.next_seq_nr += 1;
        slot.ready = false;
        slot.last_active = Instant::now();
        slot.in_flight = Some(InFlight {
            seq_nr,
            confirm_to: pending.confirm_to,
        });

        let delivery = Delivery {
            seq_nr,
            command: pending.command,
            confirm_to: ConfirmTo::new(entity_id.clone(), seq_nr, self.events_tx.clone()),
        };
        if slot.inbox.send(EntityMessage::Deliver(delivery)).await.is_err() {
            warn!(%entity_id, seq_nr, "Entity inbox closed");
            self.stop_entity(entity_id).await;
        }
    }

    async fn passivate_idle(&mut self) {
        let now = Instant::now();
        let idle_after = self.settings.passivate_idle_after;
        let idle: Vec<EntityId> = self
            .entities
            .iter()
            .filter(|(_, slot)| slot.is_idle() && now.duration_since(slot.last_active) >= idle_after)
            .map(|(entity_id, _)| entity_id.clone())
            .collect();

        for entity_id in idle {
            info!(%entity_id, "Passivating idle entity");
            self.stop_entity(&entity_id).await;
        }
        self.stopping.retain(|handle| !handle.is_finished());
    }

    /// Stops one entity. Anything still buffered for it is released so upstream demand
    /// accounting does not stall.
    async fn stop_entity(&mut self, entity_id: &EntityId) {
        let Some(slot) = self.entities.remove(entity_id) else {
            return;
        };
        if let Some(in_flight) = slot.in_flight {
            release(in_flight.confirm_to, Some(entity_id));
        }
        for pending in slot.pending {
            release(pending.confirm_to, Some(entity_id));
        }
        let _ = slot.inbox.send(EntityMessage::Stop).await;
        self.stopping.push(slot.handle);
    }

    async fn stop_all(&mut self) {
        let entity_ids: Vec<EntityId> = self.entities.keys().cloned().collect();
        for entity_id in entity_ids {
            self.stop_entity(&entity_id).await;
        }
        for handle in self.stopping.drain(..) {
            if let Err(e) = handle.await {
                error!("Entity task failed: {:?}", e);
            }
        }
    }
}

fn release(confirm_to: Option<ConfirmationSink>, entity_id: Option<&EntityId>) {
    if let Some(sink) = confirm_to {
        let _ = sink.send(entity_id.cloned());
    }
}

async fn run_entity<E: ShardedEntity>(
    mut entity: E,
    mut inbox: mpsc::Receiver<EntityMessage<E>>,
    consumer: ConsumerHandle,
) {
    let entity_id = consumer.entity_id().clone();
    if let Err(e) = entity.on_start(&consumer).await {
        warn!(%entity_id, error = %e, "on_start failed");
    }

    while let Some(message) = inbox.recv().await {
        match message {
            EntityMessage::Deliver(delivery) => {
                debug!(%entity_id, seq_nr = delivery.seq_nr, command = ?delivery.command, "Deliver");
                entity.on_delivery(delivery, &consumer).await;
            }
            EntityMessage::Snapshot(respond_to) => {
                let _ = respond_to.send(Ok(Some(entity.snapshot())));
            }
            EntityMessage::Stop => break,
        }
    }

    entity.on_stop().await;
    debug!(%entity_id, "Entity stopped");
}
