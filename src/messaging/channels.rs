// Communication channels lock-free

use crate::messaging::command::Command;
use crate::messaging::notification::Notification;
use crate::model::sample::Waveform;
use ringbuf::{HeapRb, traits::Split};
use std::sync::Arc;

pub type CommandProducer = ringbuf::HeapProd<Command>;
pub type CommandConsumer = ringbuf::HeapCons<Command>;

pub fn create_command_channel(capacity: usize) -> (CommandProducer, CommandConsumer) {
    let rb = HeapRb::<Command>::new(capacity);
    rb.split()
}

pub type NotificationProducer = ringbuf::HeapProd<Notification>;
pub type NotificationConsumer = ringbuf::HeapCons<Notification>;

pub fn create_notification_channel(
    capacity: usize,
) -> (NotificationProducer, NotificationConsumer) {
    let rb = HeapRb::<Notification>::new(capacity);
    rb.split()
}

/// Waveforms whose last handle was dropped by a voice, to be freed off the render thread
pub type GarbageProducer = ringbuf::HeapProd<Arc<Waveform>>;
pub type GarbageConsumer = ringbuf::HeapCons<Arc<Waveform>>;

pub fn create_garbage_channel(capacity: usize) -> (GarbageProducer, GarbageConsumer) {
    let rb = HeapRb::<Arc<Waveform>>::new(capacity);
    rb.split()
}
