//! Frame and movement events, the per-tick queue, and the listener channels.
//!
//! Events are never delivered while the driver mutates its state. Producers
//! append to [`EventQueue`]; the driver drains it once the tick's mutation is
//! done, in production order.
//!
//! Two independent channels receive every event:
//! - the listener closure, which gets `&mut ArmatureAnimation` and may call back
//!   into the driver,
//! - the legacy target/selector pair, which holds a weak reference to a target
//!   object and a plain function pointer invoked on it.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};

use crate::animation::ArmatureAnimation;
use crate::ids::{ArmatureId, BoneId};

/// Lifecycle notifications of a whole movement.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementEventType {
    Start,
    Complete,
    LoopComplete,
}

impl MovementEventType {
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Complete => "complete",
            Self::LoopComplete => "loop_complete",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameEvent {
    pub bone: BoneId,
    pub frame_event_name: String,
    /// Frame the event was authored at.
    pub origin_frame_index: u32,
    /// Frame the play head had reached when the event fired; later than the
    /// origin when a tick sweeps over several frames.
    pub current_frame_index: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MovementEvent {
    pub armature: ArmatureId,
    pub movement_type: MovementEventType,
    pub movement_id: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum QueuedEvent {
    Frame(FrameEvent),
    Movement(MovementEvent),
}

/// FIFO of events awaiting dispatch.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<QueuedEvent>,
}

impl EventQueue {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn push_frame(&mut self, event: FrameEvent) {
        self.events.push_back(QueuedEvent::Frame(event));
    }

    #[inline]
    pub fn push_movement(&mut self, event: MovementEvent) {
        self.events.push_back(QueuedEvent::Movement(event));
    }

    #[inline]
    pub fn pop(&mut self) -> Option<QueuedEvent> {
        self.events.pop_front()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

pub type MovementEventListener = Box<dyn FnMut(&mut ArmatureAnimation, &MovementEvent)>;
pub type FrameEventListener = Box<dyn FnMut(&mut ArmatureAnimation, &FrameEvent)>;

/// Legacy selector invoked on the target: (armature, kind, movement id).
pub type MovementEventSelector<T> = fn(&mut T, ArmatureId, MovementEventType, &str);
/// Legacy selector invoked on the target: (bone, event name, origin frame, current frame).
pub type FrameEventSelector<T> = fn(&mut T, BoneId, &str, u32, u32);

pub(crate) trait MovementEventTarget {
    fn invoke(&self, event: &MovementEvent);
}

pub(crate) trait FrameEventTarget {
    fn invoke(&self, event: &FrameEvent);
}

/// Target is held weakly; a dropped target silently stops receiving events.
pub(crate) struct MovementSelectorBinding<T> {
    pub target: Weak<RefCell<T>>,
    pub selector: MovementEventSelector<T>,
}

pub(crate) struct FrameSelectorBinding<T> {
    pub target: Weak<RefCell<T>>,
    pub selector: FrameEventSelector<T>,
}

impl<T> MovementSelectorBinding<T> {
    pub fn new(target: &Rc<RefCell<T>>, selector: MovementEventSelector<T>) -> Self {
        Self {
            target: Rc::downgrade(target),
            selector,
        }
    }
}

impl<T> FrameSelectorBinding<T> {
    pub fn new(target: &Rc<RefCell<T>>, selector: FrameEventSelector<T>) -> Self {
        Self {
            target: Rc::downgrade(target),
            selector,
        }
    }
}

impl<T> MovementEventTarget for MovementSelectorBinding<T> {
    fn invoke(&self, event: &MovementEvent) {
        let Some(target) = self.target.upgrade() else {
            return;
        };
        let Ok(mut target) = target.try_borrow_mut() else {
            log::warn!(
                "movement event target already borrowed; dropping {} for '{}'",
                event.movement_type.name(),
                event.movement_id
            );
            return;
        };
        (self.selector)(
            &mut *target,
            event.armature,
            event.movement_type,
            &event.movement_id,
        );
    }
}

impl<T> FrameEventTarget for FrameSelectorBinding<T> {
    fn invoke(&self, event: &FrameEvent) {
        let Some(target) = self.target.upgrade() else {
            return;
        };
        let Ok(mut target) = target.try_borrow_mut() else {
            log::warn!(
                "frame event target already borrowed; dropping '{}'",
                event.frame_event_name
            );
            return;
        };
        (self.selector)(
            &mut *target,
            event.bone,
            &event.frame_event_name,
            event.origin_frame_index,
            event.current_frame_index,
        );
    }
}

/// Listener storage that survives being taken out for a callback.
///
/// Every set/clear bumps the revision; a listener is only put back after its
/// callback if nobody replaced or cleared the slot meanwhile.
pub(crate) struct ListenerSlot<L> {
    listener: Option<L>,
    revision: u64,
}

impl<L> Default for ListenerSlot<L> {
    fn default() -> Self {
        Self {
            listener: None,
            revision: 0,
        }
    }
}

impl<L> ListenerSlot<L> {
    pub fn set(&mut self, listener: L) {
        self.listener = Some(listener);
        self.revision = self.revision.wrapping_add(1);
    }

    pub fn clear(&mut self) {
        self.listener = None;
        self.revision = self.revision.wrapping_add(1);
    }

    pub fn is_set(&self) -> bool {
        self.listener.is_some()
    }

    pub fn take(&mut self) -> Option<(L, u64)> {
        self.listener.take().map(|l| (l, self.revision))
    }

    pub fn restore(&mut self, listener: L, revision: u64) {
        if self.revision == revision {
            self.listener = Some(listener);
        }
    }
}

#[derive(Default)]
pub(crate) struct EventChannels {
    pub movement_listener: ListenerSlot<MovementEventListener>,
    pub frame_listener: ListenerSlot<FrameEventListener>,
    pub movement_target: Option<Box<dyn MovementEventTarget>>,
    pub frame_target: Option<Box<dyn FrameEventTarget>>,
}
