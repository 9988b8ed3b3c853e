#![allow(deprecated)]

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use armature_animation_core::{
    AnimationData, Armature, ArmatureAnimation, ArmatureId, BlendDuration, BoneId, IdAllocator,
    LoopMode, MovementEventType,
};
use armature_test_fixtures::{animations, armatures};

const TICK: f32 = 1.0 / 60.0;

type Log = Rc<RefCell<Vec<String>>>;

fn hero() -> ArmatureAnimation {
    let layout = armatures::layout("hero").unwrap();
    let mut ids = IdAllocator::new();
    let mut armature = Armature::new(ids.alloc_armature(), layout.name);
    for bone in &layout.bones {
        armature.add_bone(&mut ids, bone.as_str());
    }
    let data: AnimationData = animations::load("hero").unwrap();
    let mut anim = ArmatureAnimation::new(armature);
    anim.set_animation_data(Arc::new(data));
    anim
}

/// Receiver for the legacy target/selector channel.
struct Host {
    log: Log,
}

fn on_movement(host: &mut Host, _: ArmatureId, kind: MovementEventType, movement: &str) {
    host.log
        .borrow_mut()
        .push(format!("legacy:{}:{movement}", kind.name()));
}

fn on_frame(host: &mut Host, _: BoneId, name: &str, origin: u32, current: u32) {
    host.log
        .borrow_mut()
        .push(format!("legacy:{name}:{origin}:{current}"));
}

fn listen(anim: &mut ArmatureAnimation, log: &Log) {
    let sink = Rc::clone(log);
    anim.set_movement_event_listener(move |_, e| {
        sink.borrow_mut()
            .push(format!("listener:{}:{}", e.movement_type.name(), e.movement_id));
    });
    let sink = Rc::clone(log);
    anim.set_frame_event_listener(move |_, e| {
        sink.borrow_mut().push(format!(
            "listener:{}:{}:{}",
            e.frame_event_name, e.origin_frame_index, e.current_frame_index
        ));
    });
}

#[test]
fn both_channels_receive_every_event() {
    let mut anim = hero();
    let log = Log::default();
    let host = Rc::new(RefCell::new(Host {
        log: Rc::clone(&log),
    }));
    anim.set_movement_event_call_func(&host, on_movement);
    anim.set_frame_event_call_func(&host, on_frame);
    listen(&mut anim, &log);

    anim.play("walk", BlendDuration::Frames(0), LoopMode::MovementDefault)
        .unwrap();
    anim.update(7.0 * TICK);
    assert_eq!(
        *log.borrow(),
        [
            "legacy:start:walk",
            "listener:start:walk",
            "legacy:step_left:0:7",
            "listener:step_left:0:7",
            "legacy:step_right:5:7",
            "listener:step_right:5:7",
        ]
    );
}

#[test]
fn frame_events_carry_the_bone_handle() {
    let mut anim = hero();
    let body = anim.armature().bone("body").unwrap().id;
    let bones = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&bones);
    anim.set_frame_event_listener(move |_, e| sink.borrow_mut().push(e.bone));
    anim.play("jump", BlendDuration::Frames(0), LoopMode::MovementDefault)
        .unwrap();
    anim.update(5.0 * TICK);
    assert_eq!(*bones.borrow(), [body, body]);
}

#[test]
fn movement_events_carry_the_armature_handle() {
    let mut anim = hero();
    let expected = anim.armature().id();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    anim.set_movement_event_listener(move |_, e| sink.borrow_mut().push(e.armature));
    anim.play("jump", BlendDuration::Frames(0), LoopMode::MovementDefault)
        .unwrap();
    anim.update(5.0 * TICK);
    assert_eq!(*seen.borrow(), [expected, expected]);
}

#[test]
fn legacy_channel_stops_when_target_is_dropped() {
    let mut anim = hero();
    let log = Log::default();
    let host = Rc::new(RefCell::new(Host {
        log: Rc::clone(&log),
    }));
    anim.set_movement_event_call_func(&host, on_movement);
    drop(host);

    let modern = Log::default();
    listen(&mut anim, &modern);
    anim.play("jump", BlendDuration::Frames(0), LoopMode::MovementDefault)
        .unwrap();
    anim.update(TICK);
    assert!(log.borrow().is_empty());
    assert_eq!(*modern.borrow(), ["listener:start:jump"]);
}

#[test]
fn cleared_channels_stay_silent() {
    let mut anim = hero();
    let log = Log::default();
    let host = Rc::new(RefCell::new(Host {
        log: Rc::clone(&log),
    }));
    anim.set_movement_event_call_func(&host, on_movement);
    anim.set_frame_event_call_func(&host, on_frame);
    listen(&mut anim, &log);
    anim.clear_movement_event_call_func();
    anim.clear_frame_event_call_func();
    anim.clear_movement_event_listener();
    anim.clear_frame_event_listener();

    anim.play("jump", BlendDuration::Frames(0), LoopMode::MovementDefault)
        .unwrap();
    anim.update(5.0 * TICK);
    assert!(log.borrow().is_empty());
    assert_eq!(anim.pending_event_count(), 0);
}

#[test]
fn events_queued_between_ticks_flush_on_next_update() {
    let mut anim = hero();
    let log = Log::default();
    listen(&mut anim, &log);
    anim.play("walk", BlendDuration::Frames(0), LoopMode::MovementDefault)
        .unwrap();
    anim.play("jump", BlendDuration::Frames(0), LoopMode::MovementDefault)
        .unwrap();
    assert_eq!(anim.pending_event_count(), 2);
    anim.update(0.0);
    assert_eq!(*log.borrow(), ["listener:start:walk", "listener:start:jump"]);
    assert_eq!(anim.pending_event_count(), 0);
}

#[test]
fn play_from_a_listener_joins_the_same_drain() {
    let mut anim = hero();
    let log = Log::default();
    let sink = Rc::clone(&log);
    anim.set_movement_event_listener(move |anim, e| {
        sink.borrow_mut()
            .push(format!("{}:{}", e.movement_type.name(), e.movement_id));
        if e.movement_type == MovementEventType::Complete && e.movement_id == "jump" {
            anim.play("walk", BlendDuration::Frames(0), LoopMode::MovementDefault)
                .unwrap();
        }
    });
    anim.play("jump", BlendDuration::Frames(0), LoopMode::MovementDefault)
        .unwrap();
    anim.update(5.0 * TICK);
    assert_eq!(*log.borrow(), ["start:jump", "complete:jump", "start:walk"]);
    assert_eq!(anim.current_movement_id(), Some("walk"));
    assert!(anim.is_playing());
    assert_eq!(anim.pending_event_count(), 0);
}

#[test]
fn listener_sees_advanced_state() {
    let mut anim = hero();
    let frames = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&frames);
    anim.set_frame_event_listener(move |anim, _| {
        sink.borrow_mut().push(anim.current_frame_index());
    });
    anim.play("jump", BlendDuration::Frames(0), LoopMode::MovementDefault)
        .unwrap();
    anim.update(3.0 * TICK);
    assert_eq!(*frames.borrow(), [3]);
}

#[test]
fn listener_replaced_from_its_own_callback_keeps_the_replacement() {
    let mut anim = hero();
    let log = Log::default();
    let first = Rc::clone(&log);
    let second = Rc::clone(&log);
    anim.set_movement_event_listener(move |anim, e| {
        first
            .borrow_mut()
            .push(format!("first:{}", e.movement_type.name()));
        let sink = Rc::clone(&second);
        anim.set_movement_event_listener(move |_, e| {
            sink.borrow_mut()
                .push(format!("second:{}", e.movement_type.name()));
        });
    });
    anim.play("walk", BlendDuration::Frames(0), LoopMode::MovementDefault)
        .unwrap();
    anim.update(10.0 * TICK);
    assert_eq!(*log.borrow(), ["first:start", "second:loop_complete"]);
}

#[test]
fn listener_cleared_from_its_own_callback_stays_cleared() {
    let mut anim = hero();
    let count = Rc::new(RefCell::new(0));
    let sink = Rc::clone(&count);
    anim.set_movement_event_listener(move |anim, _| {
        *sink.borrow_mut() += 1;
        anim.clear_movement_event_listener();
    });
    anim.play("jump", BlendDuration::Frames(0), LoopMode::MovementDefault)
        .unwrap();
    anim.update(5.0 * TICK);
    assert_eq!(*count.borrow(), 1);
}

#[test]
fn stop_from_a_listener_still_flushes_queued_events() {
    let mut anim = hero();
    let log = Log::default();
    listen(&mut anim, &log);
    let sink = Rc::clone(&log);
    anim.set_frame_event_listener(move |anim, e| {
        sink.borrow_mut().push(format!("frame:{}", e.frame_event_name));
        if e.frame_event_name == "step_right" {
            anim.stop();
        }
    });
    anim.play("walk", BlendDuration::Frames(0), LoopMode::MovementDefault)
        .unwrap();
    anim.update(10.0 * TICK);
    assert_eq!(
        *log.borrow(),
        [
            "listener:start:walk",
            "frame:step_left",
            "frame:step_right",
            "listener:loop_complete:walk",
            "frame:step_left",
        ]
    );
    assert!(anim.is_complete());
    anim.update(TICK);
    assert_eq!(log.borrow().len(), 5);
}

#[test]
fn user_object_round_trips() {
    #[derive(Debug, PartialEq)]
    struct Tag(&'static str);

    let mut anim = hero();
    assert!(anim.user_object::<Tag>().is_none());
    anim.set_user_object(Tag("hero"));
    assert_eq!(anim.user_object::<Tag>(), Some(&Tag("hero")));
    assert!(anim.user_object::<u32>().is_none());

    anim.user_object_mut::<Tag>().unwrap().0 = "villain";
    anim.set_user_object(7_u32);
    assert!(anim.user_object::<Tag>().is_none());
    assert_eq!(anim.take_user_object().unwrap().downcast_ref::<u32>(), Some(&7));
    assert!(anim.take_user_object().is_none());
}

#[test]
fn panicking_listener_does_not_wedge_the_queue() {
    let mut anim = hero();
    anim.set_movement_event_listener(|_, _| panic!("listener failure"));
    anim.play("jump", BlendDuration::Frames(0), LoopMode::MovementDefault)
        .unwrap();
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        anim.update(TICK);
    }));
    assert!(result.is_err());

    let log = Log::default();
    listen(&mut anim, &log);
    anim.play("walk", BlendDuration::Frames(0), LoopMode::MovementDefault)
        .unwrap();
    anim.update(TICK);
    assert_eq!(
        log.borrow().first().map(String::as_str),
        Some("listener:start:walk")
    );
    assert_eq!(anim.pending_event_count(), 0);
}
