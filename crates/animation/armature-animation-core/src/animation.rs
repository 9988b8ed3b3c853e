//! ArmatureAnimation: movement playback for one armature.
//!
//! Per tick (`update`):
//! 1) convert `dt` into frames (speed scale × movement scale / frame interval)
//! 2) consume the blend budget of the last play call, then move the play head,
//!    queueing crossed frame events and loop/complete events in temporal order
//! 3) sample every tween binding into [`Outputs`]
//! 4) drain the event queue to the listeners
//!
//! Play-style calls between ticks only queue their events; they are delivered
//! by the next drain.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;
use std::sync::Arc;

use crate::armature::Armature;
use crate::config::Config;
use crate::data::{AnimationData, MovementData};
use crate::error::ArmatureError;
use crate::event::{
    EventChannels, EventQueue, FrameEvent, FrameEventSelector, FrameSelectorBinding,
    MovementEvent, MovementEventSelector, MovementEventType, MovementSelectorBinding, QueuedEvent,
};
use crate::ids::ArmatureId;
use crate::inputs::{BlendDuration, LoopMode, PlaybackState};
use crate::outputs::{Outputs, PoseChange};
use crate::sequencer::MovementList;
use crate::tween::{crossed_events, KeyframeTweenFactory, TweenBinding, TweenFactory};
use crate::Result;

/// Frame deltas this close to a whole number snap to it, so that
/// `n * frame_interval` seconds advance exactly `n` frames.
const FRAME_SNAP_EPSILON: f32 = 1e-4;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Status {
    Stopped,
    Playing,
    Paused,
}

#[derive(Copy, Clone, Debug)]
struct Blend {
    duration: f32,
    elapsed: f32,
}

impl Blend {
    fn weight(&self) -> f32 {
        (self.elapsed / self.duration).clamp(0.0, 1.0)
    }
}

enum StepOutcome {
    Running,
    Completed,
}

struct ActiveMovement {
    data: Arc<MovementData>,
    looping: bool,
    frame: f32,
    /// Last frame index whose events were delivered; `None` before frame 0.
    visited: Option<u32>,
    blend: Option<Blend>,
    tweens: Vec<TweenBinding>,
}

impl ActiveMovement {
    /// Move the play head forward by `frames`. A looping movement wraps at
    /// most once per call: a tick spanning several laps reports one
    /// `LoopComplete` and lands on `target % frame_count`.
    fn step(
        &mut self,
        frames: f32,
        armature: ArmatureId,
        ignore_frame_events: bool,
        queue: &mut EventQueue,
    ) -> StepOutcome {
        let frame_count = self.data.frame_count;
        let end = frame_count as f32;
        let target = self.frame + frames;
        if target < end {
            self.frame = target;
            self.sweep(target as u32, ignore_frame_events, queue);
            return StepOutcome::Running;
        }
        self.sweep(frame_count - 1, ignore_frame_events, queue);
        if !self.looping {
            self.frame = (frame_count - 1) as f32;
            return StepOutcome::Completed;
        }
        queue.push_movement(MovementEvent {
            armature,
            movement_type: MovementEventType::LoopComplete,
            movement_id: self.data.name.clone(),
        });
        self.visited = None;
        let wrapped = target % end;
        self.frame = wrapped;
        self.sweep(wrapped as u32, ignore_frame_events, queue);
        StepOutcome::Running
    }

    /// Queue the frame events keyed after `visited` up to and including `upto`.
    fn sweep(&mut self, upto: u32, ignore_frame_events: bool, queue: &mut EventQueue) {
        if self.visited.is_some_and(|v| v >= upto) {
            return;
        }
        if !ignore_frame_events {
            for crossed in crossed_events(&self.tweens, self.visited, upto) {
                queue.push_frame(FrameEvent {
                    bone: crossed.bone,
                    frame_event_name: crossed.name,
                    origin_frame_index: crossed.origin_frame,
                    current_frame_index: upto,
                });
            }
        }
        self.visited = Some(upto);
    }
}

/// Clears the drain flag when the drain ends, including by a listener panic.
struct DrainGuard<'a>(&'a mut ArmatureAnimation);

impl Deref for DrainGuard<'_> {
    type Target = ArmatureAnimation;

    fn deref(&self) -> &ArmatureAnimation {
        self.0
    }
}

impl DerefMut for DrainGuard<'_> {
    fn deref_mut(&mut self) -> &mut ArmatureAnimation {
        self.0
    }
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.draining_events = false;
    }
}

/// Drives one armature through the movements of its [`AnimationData`].
pub struct ArmatureAnimation {
    cfg: Config,
    armature: Armature,
    animation_data: Option<Arc<AnimationData>>,
    tween_factory: Box<dyn TweenFactory>,
    speed_scale: f32,
    status: Status,
    active: Option<ActiveMovement>,
    ignore_frame_event: bool,
    movement_list: Option<MovementList>,
    queue: EventQueue,
    channels: EventChannels,
    draining_events: bool,
    outputs: Outputs,
    user_object: Option<Box<dyn Any>>,
}

impl fmt::Debug for ArmatureAnimation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArmatureAnimation")
            .field("armature", &self.armature.id())
            .field("state", &self.state())
            .field(
                "movement",
                &self.active.as_ref().map(|a| a.data.name.as_str()),
            )
            .field("frame", &self.current_frame_index())
            .field("speed_scale", &self.speed_scale)
            .field("on_movement_list", &self.movement_list.is_some())
            .field("queued_events", &self.queue.len())
            .field(
                "listeners",
                &(
                    self.channels.movement_listener.is_set(),
                    self.channels.frame_listener.is_set(),
                ),
            )
            .finish_non_exhaustive()
    }
}

impl ArmatureAnimation {
    /// Create a stopped driver for `armature` with the default config.
    pub fn new(armature: Armature) -> Self {
        Self::build(armature, Config::default())
    }

    pub fn with_config(armature: Armature, cfg: Config) -> Result<Self> {
        cfg.validate()?;
        Ok(Self::build(armature, cfg))
    }

    fn build(armature: Armature, cfg: Config) -> Self {
        Self {
            queue: EventQueue::with_capacity(cfg.event_queue_capacity),
            cfg,
            armature,
            animation_data: None,
            tween_factory: Box::new(KeyframeTweenFactory),
            speed_scale: 1.0,
            status: Status::Stopped,
            active: None,
            ignore_frame_event: false,
            movement_list: None,
            channels: EventChannels::default(),
            draining_events: false,
            outputs: Outputs::default(),
            user_object: None,
        }
    }

    pub fn armature(&self) -> &Armature {
        &self.armature
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Bind the movements to play. The previous data is released; a movement
    /// already playing keeps running on its own reference.
    pub fn set_animation_data(&mut self, data: Arc<AnimationData>) {
        if self
            .animation_data
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, &data))
        {
            return;
        }
        log::debug!(
            "armature {:?}: bound animation data '{}' ({} movements)",
            self.armature.id(),
            data.name(),
            data.len()
        );
        self.animation_data = Some(data);
    }

    pub fn animation_data(&self) -> Option<&Arc<AnimationData>> {
        self.animation_data.as_ref()
    }

    pub fn movement_count(&self) -> usize {
        self.animation_data.as_ref().map_or(0, |d| d.len())
    }

    /// Replace the tween factory; applies from the next play call.
    pub fn set_tween_factory(&mut self, factory: impl TweenFactory + 'static) {
        self.tween_factory = Box::new(factory);
    }

    /// Scale playback speed. Zero freezes time while the status stays playing.
    pub fn set_speed_scale(&mut self, speed_scale: f32) {
        if speed_scale >= 0.0 && speed_scale.is_finite() {
            self.speed_scale = speed_scale;
        } else {
            log::warn!("speed scale must be a finite value >= 0, got {speed_scale}; using 0");
            self.speed_scale = 0.0;
        }
    }

    pub fn speed_scale(&self) -> f32 {
        self.speed_scale
    }

    #[deprecated(note = "use set_speed_scale")]
    pub fn set_animation_scale(&mut self, animation_scale: f32) {
        self.set_speed_scale(animation_scale);
    }

    #[deprecated(note = "use speed_scale")]
    pub fn animation_scale(&self) -> f32 {
        self.speed_scale
    }

    fn bound_data(&self) -> Result<&Arc<AnimationData>> {
        self.animation_data.as_ref().ok_or_else(|| {
            log::warn!(
                "armature {:?}: no animation data bound",
                self.armature.id()
            );
            ArmatureError::NoAnimationData
        })
    }

    fn find_movement(&self, name: &str) -> Result<Arc<MovementData>> {
        let data = self.bound_data()?;
        data.movement(name).cloned().ok_or_else(|| {
            log::warn!(
                "armature {:?}: movement '{name}' not found in '{}'",
                self.armature.id(),
                data.name()
            );
            ArmatureError::MovementNotFound {
                name: name.to_string(),
            }
        })
    }

    fn cancel_movement_list(&mut self) {
        if self.movement_list.take().is_some() {
            log::debug!(
                "armature {:?}: movement list cancelled",
                self.armature.id()
            );
        }
    }

    /// Play the named movement.
    ///
    /// Frame position resets to 0 and a `Start` event is queued. When another
    /// movement is active and the resolved blend length is non-zero, the new
    /// movement blends in over that many frames with frame events suppressed.
    /// Cancels list mode. Fails without touching playback state when no data
    /// is bound or the name is unknown.
    pub fn play(&mut self, name: &str, duration_to: BlendDuration, loop_mode: LoopMode) -> Result<()> {
        let movement = self.find_movement(name)?;
        self.cancel_movement_list();
        self.start_movement(movement, duration_to, loop_mode);
        Ok(())
    }

    /// Play the movement at `index` in declaration order.
    pub fn play_with_index(
        &mut self,
        index: usize,
        duration_to: BlendDuration,
        loop_mode: LoopMode,
    ) -> Result<()> {
        let data = self.bound_data()?;
        let Some(movement) = data.movement_at(index).cloned() else {
            let count = data.len();
            log::warn!(
                "armature {:?}: movement index {index} out of range ({count} movements)",
                self.armature.id()
            );
            return Err(ArmatureError::MovementIndexOutOfRange { index, count });
        };
        self.cancel_movement_list();
        self.start_movement(movement, duration_to, loop_mode);
        Ok(())
    }

    #[deprecated(note = "use play_with_index")]
    pub fn play_by_index(
        &mut self,
        index: usize,
        duration_to: BlendDuration,
        loop_mode: LoopMode,
    ) -> Result<()> {
        self.play_with_index(index, duration_to, loop_mode)
    }

    /// Play `names` back to back. Each entry plays once; after the last one the
    /// list starts over when `looping`, otherwise list mode ends. Every name is
    /// checked before anything starts.
    pub fn play_with_names<S: AsRef<str>>(
        &mut self,
        names: &[S],
        duration_to: BlendDuration,
        looping: bool,
    ) -> Result<()> {
        let names: Vec<String> = names.iter().map(|n| n.as_ref().to_owned()).collect();
        let Some(mut list) = MovementList::new(names.clone(), looping, duration_to) else {
            log::warn!("armature {:?}: empty movement list", self.armature.id());
            return Err(ArmatureError::EmptyMovementList);
        };
        let data = self.bound_data()?;
        if let Some(missing) = names.iter().find(|n| data.movement(n).is_none()) {
            log::warn!(
                "armature {:?}: movement list references unknown movement '{missing}'",
                self.armature.id()
            );
            return Err(ArmatureError::MovementNotFound {
                name: missing.clone(),
            });
        }
        let Some(first) = list.next_entry().map(str::to_owned) else {
            return Err(ArmatureError::EmptyMovementList);
        };
        let movement = self.find_movement(&first)?;
        log::debug!(
            "armature {:?}: movement list {:?} (loop {looping})",
            self.armature.id(),
            names
        );
        self.movement_list = Some(list);
        self.start_movement(movement, duration_to, LoopMode::Once);
        Ok(())
    }

    /// Index form of [`play_with_names`](Self::play_with_names).
    pub fn play_with_indexes(
        &mut self,
        indexes: &[usize],
        duration_to: BlendDuration,
        looping: bool,
    ) -> Result<()> {
        if indexes.is_empty() {
            log::warn!("armature {:?}: empty movement list", self.armature.id());
            return Err(ArmatureError::EmptyMovementList);
        }
        let data = self.bound_data()?;
        let count = data.len();
        let names = indexes
            .iter()
            .map(|&index| {
                data.movement_at(index)
                    .map(|m| m.name.clone())
                    .ok_or(ArmatureError::MovementIndexOutOfRange { index, count })
            })
            .collect::<Result<Vec<_>>>();
        let names = match names {
            Ok(names) => names,
            Err(err) => {
                log::warn!("armature {:?}: {err}", self.armature.id());
                return Err(err);
            }
        };
        self.play_with_names(&names, duration_to, looping)
    }

    fn start_movement(
        &mut self,
        movement: Arc<MovementData>,
        duration_to: BlendDuration,
        loop_mode: LoopMode,
    ) {
        let blend_frames = duration_to.resolve(movement.duration_to);
        let looping = loop_mode.resolve(movement.looping);

        // A completed movement stays loaded, so list entries blend into each other.
        let previous = self.active.take();
        let replaces_other = previous
            .as_ref()
            .is_some_and(|p| p.data.name != movement.name);
        let blend = (replaces_other && blend_frames > 0).then_some(Blend {
            duration: blend_frames as f32,
            elapsed: 0.0,
        });

        let previous_tweens = previous.map(|p| p.tweens).unwrap_or_default();
        let tweens = TweenBinding::bind_all(
            &self.armature,
            &movement,
            self.tween_factory.as_ref(),
            &previous_tweens,
        );

        log::debug!(
            "armature {:?}: play '{}' ({} frames, blend {}, loop {looping}, {} bones)",
            self.armature.id(),
            movement.name,
            movement.frame_count,
            blend.map_or(0, |_| blend_frames),
            tweens.len()
        );

        self.ignore_frame_event = blend.is_some();
        self.status = Status::Playing;
        self.push_movement_event(MovementEventType::Start, &movement.name);
        self.active = Some(ActiveMovement {
            data: movement,
            looping,
            frame: 0.0,
            visited: None,
            blend,
            tweens,
        });
    }

    /// Jump to `frame` of the loaded movement and keep playing. No `Start` is
    /// emitted and the landing frame's events do not fire. An in-progress
    /// blend is cancelled.
    pub fn goto_and_play(&mut self, frame: u32) -> Result<()> {
        let armature = self.armature.id();
        let Some(active) = self.active.as_mut() else {
            log::warn!("armature {armature:?}: goto frame {frame} before any movement was played");
            return Err(ArmatureError::NoActiveMovement);
        };
        let frame_count = active.data.frame_count;
        if frame >= frame_count {
            log::warn!(
                "armature {armature:?}: frame {frame} out of range for '{}' ({frame_count} frames)",
                active.data.name
            );
            return Err(ArmatureError::FrameOutOfRange { frame, frame_count });
        }
        if active.blend.take().is_some() {
            log::debug!(
                "armature {armature:?}: goto frame {frame} cancels blend into '{}'",
                active.data.name
            );
        }
        active.frame = frame as f32;
        active.visited = Some(frame);
        self.ignore_frame_event = false;
        self.status = Status::Playing;
        Ok(())
    }

    pub fn goto_and_pause(&mut self, frame: u32) -> Result<()> {
        self.goto_and_play(frame)?;
        self.pause();
        Ok(())
    }

    pub fn pause(&mut self) {
        if self.status == Status::Playing {
            self.status = Status::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.status == Status::Paused {
            self.status = Status::Playing;
        }
    }

    /// Clear the active movement. Events already queued still go out with the
    /// next drain; nothing further is produced for the stopped movement.
    pub fn stop(&mut self) {
        if self.status == Status::Stopped {
            return;
        }
        if let Some(active) = self.active.take() {
            log::debug!(
                "armature {:?}: stop '{}' at frame {}",
                self.armature.id(),
                active.data.name,
                active.frame as u32
            );
        }
        self.status = Status::Stopped;
        self.ignore_frame_event = false;
        self.movement_list = None;
    }

    /// Advance by `dt` seconds, returning the poses computed this tick.
    /// Queued events are dispatched before this returns.
    pub fn update(&mut self, dt: f32) -> &Outputs {
        self.outputs.clear();
        if self.status == Status::Playing {
            let frames = self.delta_frames(dt);
            if frames > 0.0 {
                self.advance(frames);
            }
            self.sample_poses();
        }
        self.drain_events();
        &self.outputs
    }

    /// Poses computed by the last `update`.
    pub fn outputs(&self) -> &Outputs {
        &self.outputs
    }

    fn delta_frames(&self, dt: f32) -> f32 {
        if !dt.is_finite() || dt < 0.0 {
            log::warn!("armature {:?}: ignoring delta {dt}", self.armature.id());
            return 0.0;
        }
        if dt > self.cfg.max_delta_seconds {
            log::debug!(
                "armature {:?}: skipping {dt}s delta (max {}s)",
                self.armature.id(),
                self.cfg.max_delta_seconds
            );
            return 0.0;
        }
        let movement_scale = self.active.as_ref().map_or(1.0, |a| a.data.scale);
        let frames = dt * self.speed_scale * movement_scale / self.cfg.frame_interval;
        if !frames.is_finite() {
            log::warn!(
                "armature {:?}: frame delta overflowed (speed {}, movement scale {movement_scale})",
                self.armature.id(),
                self.speed_scale
            );
            return 0.0;
        }
        let whole = frames.round();
        if (frames - whole).abs() <= FRAME_SNAP_EPSILON {
            whole
        } else {
            frames
        }
    }

    fn advance(&mut self, frames: f32) {
        let armature = self.armature.id();
        let Some(active) = self.active.as_mut() else {
            return;
        };

        let mut remaining = frames;
        if let Some(blend) = active.blend.as_mut() {
            blend.elapsed += remaining;
            if blend.elapsed < blend.duration {
                return;
            }
            remaining = blend.elapsed - blend.duration;
            active.blend = None;
            self.ignore_frame_event = false;
            if remaining <= 0.0 {
                return;
            }
        }

        let outcome = active.step(remaining, armature, self.ignore_frame_event, &mut self.queue);
        if let StepOutcome::Completed = outcome {
            let name = active.data.name.clone();
            self.status = Status::Stopped;
            self.push_movement_event(MovementEventType::Complete, &name);
            self.advance_movement_list();
        }
    }

    fn advance_movement_list(&mut self) {
        let Some(list) = self.movement_list.as_mut() else {
            return;
        };
        let duration_to = list.duration_to();
        let Some(next) = list.next_entry().map(str::to_owned) else {
            log::debug!("armature {:?}: movement list finished", self.armature.id());
            self.movement_list = None;
            return;
        };
        match self.find_movement(&next) {
            Ok(movement) => self.start_movement(movement, duration_to, LoopMode::Once),
            Err(_) => self.movement_list = None,
        }
    }

    fn sample_poses(&mut self) {
        let armature = self.armature.id();
        let Some(active) = self.active.as_mut() else {
            return;
        };
        let weight = active.blend.map_or(1.0, |b| b.weight());
        let frame = active.frame;
        for binding in &mut active.tweens {
            let pose = binding.update(frame, weight);
            self.outputs.push_pose(PoseChange {
                armature,
                bone: binding.bone(),
                pose,
            });
        }
    }

    fn push_movement_event(&mut self, movement_type: MovementEventType, movement_id: &str) {
        self.queue.push_movement(MovementEvent {
            armature: self.armature.id(),
            movement_type,
            movement_id: movement_id.to_string(),
        });
    }

    /// Deliver queued events in order. Events queued by listeners during the
    /// drain are delivered by the same drain.
    fn drain_events(&mut self) {
        if self.draining_events {
            return;
        }
        self.draining_events = true;
        let mut this = DrainGuard(self);
        while let Some(event) = this.queue.pop() {
            match event {
                QueuedEvent::Movement(event) => this.dispatch_movement_event(&event),
                QueuedEvent::Frame(event) => this.dispatch_frame_event(&event),
            }
        }
    }

    fn dispatch_movement_event(&mut self, event: &MovementEvent) {
        if let Some(target) = &self.channels.movement_target {
            target.invoke(event);
        }
        if let Some((mut listener, revision)) = self.channels.movement_listener.take() {
            listener(self, event);
            self.channels.movement_listener.restore(listener, revision);
        }
    }

    fn dispatch_frame_event(&mut self, event: &FrameEvent) {
        if let Some(target) = &self.channels.frame_target {
            target.invoke(event);
        }
        if let Some((mut listener, revision)) = self.channels.frame_listener.take() {
            listener(self, event);
            self.channels.frame_listener.restore(listener, revision);
        }
    }

    pub fn set_movement_event_listener<F>(&mut self, listener: F)
    where
        F: FnMut(&mut ArmatureAnimation, &MovementEvent) + 'static,
    {
        self.channels.movement_listener.set(Box::new(listener));
    }

    pub fn clear_movement_event_listener(&mut self) {
        self.channels.movement_listener.clear();
    }

    pub fn set_frame_event_listener<F>(&mut self, listener: F)
    where
        F: FnMut(&mut ArmatureAnimation, &FrameEvent) + 'static,
    {
        self.channels.frame_listener.set(Box::new(listener));
    }

    pub fn clear_frame_event_listener(&mut self) {
        self.channels.frame_listener.clear();
    }

    /// Legacy channel: call `selector` on `target` for every movement event.
    /// The target is held weakly.
    #[deprecated(note = "use set_movement_event_listener")]
    pub fn set_movement_event_call_func<T: 'static>(
        &mut self,
        target: &Rc<RefCell<T>>,
        selector: MovementEventSelector<T>,
    ) {
        self.channels.movement_target =
            Some(Box::new(MovementSelectorBinding::new(target, selector)));
    }

    pub fn clear_movement_event_call_func(&mut self) {
        self.channels.movement_target = None;
    }

    /// Legacy channel: call `selector` on `target` for every frame event.
    /// The target is held weakly.
    #[deprecated(note = "use set_frame_event_listener")]
    pub fn set_frame_event_call_func<T: 'static>(
        &mut self,
        target: &Rc<RefCell<T>>,
        selector: FrameEventSelector<T>,
    ) {
        self.channels.frame_target = Some(Box::new(FrameSelectorBinding::new(target, selector)));
    }

    pub fn clear_frame_event_call_func(&mut self) {
        self.channels.frame_target = None;
    }

    pub fn state(&self) -> PlaybackState {
        match self.status {
            Status::Stopped => PlaybackState::Stopped,
            Status::Paused => PlaybackState::Paused,
            Status::Playing => {
                if self.active.as_ref().is_some_and(|a| a.blend.is_some()) {
                    PlaybackState::Blending
                } else {
                    PlaybackState::Playing
                }
            }
        }
    }

    pub fn is_playing(&self) -> bool {
        self.status == Status::Playing
    }

    pub fn is_paused(&self) -> bool {
        self.status == Status::Paused
    }

    pub fn is_complete(&self) -> bool {
        self.status == Status::Stopped
    }

    /// Name of the movement being played or paused; `None` once stopped.
    pub fn current_movement_id(&self) -> Option<&str> {
        if self.status == Status::Stopped {
            return None;
        }
        self.active.as_ref().map(|a| a.data.name.as_str())
    }

    pub fn current_frame_index(&self) -> u32 {
        self.active.as_ref().map_or(0, |a| a.frame as u32)
    }

    /// Frame count of the loaded movement.
    pub fn raw_duration(&self) -> u32 {
        self.active.as_ref().map_or(0, |a| a.data.frame_count)
    }

    pub fn is_ignoring_frame_events(&self) -> bool {
        self.ignore_frame_event
    }

    pub fn is_on_movement_list(&self) -> bool {
        self.movement_list.is_some()
    }

    pub fn pending_event_count(&self) -> usize {
        self.queue.len()
    }

    /// Attach an owned user value, dropping the previous one.
    pub fn set_user_object<T: Any>(&mut self, value: T) {
        self.user_object = Some(Box::new(value));
    }

    pub fn user_object<T: Any>(&self) -> Option<&T> {
        self.user_object.as_deref()?.downcast_ref()
    }

    pub fn user_object_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.user_object.as_deref_mut()?.downcast_mut()
    }

    pub fn take_user_object(&mut self) -> Option<Box<dyn Any>> {
        self.user_object.take()
    }
}
