use super::*;
use crate::event::Event;

fn tables() -> (LocalStateTable, EnvTable) {
    (LocalStateTable::default(), EnvTable::default())
}

#[test]
fn handler_ids_are_fresh_every_build() {
    let (mut locals, env) = tables();
    let mut seed = 1;

    let mut ctx = BuildContext::new(&mut seed, &mut locals, &env);
    let first = ctx.on(|_, _| {});
    let second = ctx.on(|_, _| {});
    let (_deps, handlers) = ctx.finish(|| {});
    assert_ne!(first, second);
    assert_eq!(handlers.len(), 2);

    let mut ctx = BuildContext::new(&mut seed, &mut locals, &env);
    let third = ctx.on(|_, _| {});
    let (_deps, next_handlers) = ctx.finish(|| {});
    assert!(third > second);
    // The previous build's ids are gone from the fresh table.
    assert!(!next_handlers.contains_key(&first));
}

#[test]
fn handlers_receive_the_event() {
    let (mut locals, env) = tables();
    let mut seed = 1;
    let mut ctx = BuildContext::new(&mut seed, &mut locals, &env);
    let seen = std::rc::Rc::new(std::cell::Cell::new(false));
    let flag = seen.clone();
    let id = ctx.on(move |_, event| {
        flag.set(event.name() == "click");
    });
    let (_deps, handlers) = ctx.finish(|| {});

    let mut dispatch = DispatchContext::new();
    (handlers[&id])(
        &mut dispatch,
        &Event::Click {
            pointer: 1,
            x: 0.0,
            y: 0.0,
        },
    );
    assert!(seen.get());
}

#[test]
fn local_state_persists_across_builds() {
    let (mut locals, env) = tables();
    let mut seed = 1;

    let mut ctx = BuildContext::new(&mut seed, &mut locals, &env);
    let count = ctx.state("count", || 0);
    count.set(3);
    let (_deps, _handlers) = ctx.finish(|| {});

    let mut ctx = BuildContext::new(&mut seed, &mut locals, &env);
    let again = ctx.state("count", || 0);
    assert_eq!(again.peek(), 3);
    assert_eq!(count, again);
}

#[test]
fn mismatched_local_state_resets_softly() {
    let (mut locals, env) = tables();
    let mut seed = 1;
    let mut ctx = BuildContext::new(&mut seed, &mut locals, &env);
    let _count = ctx.state("slot", || 0i64);
    let text = ctx.state("slot", || String::from("fresh"));
    assert_eq!(text.peek(), "fresh");
}

#[test]
fn env_lookup_is_typed_and_soft() {
    let (mut locals, mut env) = tables();
    env.insert("theme", String::from("dark"));
    let mut seed = 1;
    let ctx = BuildContext::new(&mut seed, &mut locals, &env);
    assert_eq!(
        ctx.env::<String>("theme").map(|theme| theme.to_string()),
        Some("dark".to_string())
    );
    assert!(ctx.env::<i64>("theme").is_none());
    assert!(ctx.env::<String>("missing").is_none());
}
