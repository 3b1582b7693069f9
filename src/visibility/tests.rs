use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use pretty_assertions::assert_eq;

use super::*;

const VIEWPORT: Rect = Rect::new(0.0, 0.0, 800.0, 600.0);

fn observer(options: ObserverOptions) -> VisibilityObserver {
    VisibilityObserver::new(VIEWPORT, options)
}

#[test]
fn element_inside_viewport_is_visible() {
    let observer = observer(ObserverOptions::default());
    let element = observer.observe();

    element.attach(Rect::new(10.0, 10.0, 100.0, 100.0));
    assert!(element.is_visible());

    element.move_to(Rect::new(10.0, 900.0, 100.0, 100.0));
    assert!(!element.is_visible());
}

#[test]
fn scrolling_the_viewport_reevaluates_attached_elements() {
    let observer = observer(ObserverOptions::default());
    let element = observer.observe();
    element.attach(Rect::new(0.0, 1000.0, 200.0, 200.0));
    assert!(!element.is_visible());

    observer.set_viewport(Rect::new(0.0, 700.0, 800.0, 600.0));
    assert!(element.is_visible());
}

#[test]
fn root_margin_expands_detection_area() {
    let options = ObserverOptions {
        root_margin: "200px 0px".parse().unwrap(),
        ..ObserverOptions::default()
    };
    let observer = observer(options);
    let element = observer.observe();

    element.attach(Rect::new(0.0, 750.0, 100.0, 100.0));
    assert!(element.is_visible());

    element.move_to(Rect::new(0.0, 850.0, 100.0, 100.0));
    assert!(!element.is_visible());
}

#[test]
fn percentage_margin_resolves_against_root_size() {
    let margin: RootMargin = "-10%".parse().unwrap();
    let shrunk = margin.apply(&VIEWPORT);
    assert_eq!(shrunk, Rect::new(80.0, 60.0, 640.0, 480.0));
}

#[test]
fn threshold_requires_enough_overlap() {
    let options = ObserverOptions {
        threshold: 0.5,
        ..ObserverOptions::default()
    };
    let observer = observer(options);
    let element = observer.observe();

    // 25% of the element overlaps the bottom of the viewport.
    element.attach(Rect::new(0.0, 550.0, 100.0, 200.0));
    assert!(!element.is_visible());

    // 50% overlaps.
    element.move_to(Rect::new(0.0, 500.0, 100.0, 200.0));
    assert!(element.is_visible());
}

#[test]
fn custom_root_replaces_viewport() {
    let options = ObserverOptions {
        root: Some(Rect::new(0.0, 0.0, 300.0, 300.0)),
        ..ObserverOptions::default()
    };
    let observer = observer(options);
    let element = observer.observe();

    element.attach(Rect::new(400.0, 100.0, 50.0, 50.0));
    assert!(!element.is_visible());
}

#[test]
fn edge_contact_counts_only_for_zero_threshold() {
    let touching = Rect::new(0.0, 600.0, 100.0, 100.0);
    assert!(ObserverOptions::default().is_visible(&VIEWPORT, &touching));

    let strict = ObserverOptions {
        threshold: 0.1,
        ..ObserverOptions::default()
    };
    assert!(!strict.is_visible(&VIEWPORT, &touching));
}

#[test]
fn attaching_new_element_replaces_previous() {
    let observer = observer(ObserverOptions::default());
    let element = observer.observe();

    element.attach(Rect::new(0.0, 0.0, 10.0, 10.0));
    element.attach(Rect::new(0.0, 5000.0, 10.0, 10.0));

    assert_eq!(observer.observed_count(), 1);
    assert!(!element.is_visible());
}

#[test]
fn detach_and_drop_stop_observation() {
    let observer = observer(ObserverOptions::default());
    let first = observer.observe();
    let second = observer.observe();
    first.attach(Rect::new(0.0, 0.0, 10.0, 10.0));
    second.attach(Rect::new(0.0, 0.0, 10.0, 10.0));
    assert_eq!(observer.observed_count(), 2);

    first.detach();
    assert!(!first.is_attached());
    assert!(!first.is_visible());

    // Layout updates after detach are ignored.
    first.move_to(Rect::new(0.0, 0.0, 10.0, 10.0));
    assert!(!first.is_visible());

    drop(second);
    assert_eq!(observer.observed_count(), 0);
}

#[test]
fn attach_racing_scroll_settles_on_latest_viewport() {
    let below = Rect::new(0.0, 2000.0, 800.0, 600.0);
    let target = Rect::new(0.0, 2100.0, 50.0, 50.0);

    for _ in 0..200 {
        let observer = observer(ObserverOptions::default());
        let element = observer.observe();
        let barrier = Arc::new(Barrier::new(2));

        let scroller = observer.clone();
        let scroll_barrier = barrier.clone();
        let scroll = thread::spawn(move || {
            scroll_barrier.wait();
            scroller.set_viewport(below);
        });

        barrier.wait();
        element.attach(target);
        scroll.join().unwrap();

        assert!(element.is_visible());
    }
}

#[test]
fn nan_threshold_counts_any_overlap() {
    let options = ObserverOptions {
        threshold: f64::NAN,
        ..ObserverOptions::default()
    };
    assert!(options.is_visible(&VIEWPORT, &Rect::new(0.0, 590.0, 100.0, 100.0)));
    assert!(!options.is_visible(&VIEWPORT, &Rect::new(0.0, 900.0, 100.0, 100.0)));
}

#[test]
fn margin_parsing_rejects_non_finite_values() {
    for token in ["NaNpx", "infpx", "inf%", "-infpx 0px"] {
        assert!(
            matches!(token.parse::<RootMargin>(), Err(MarginParseError::Value(_))),
            "{token} should be rejected"
        );
    }
}

#[test]
fn margin_parsing_rejects_bad_input() {
    assert_eq!(
        "".parse::<RootMargin>(),
        Err(MarginParseError::Arity(0))
    );
    assert_eq!(
        "1px 2px 3px 4px 5px".parse::<RootMargin>(),
        Err(MarginParseError::Arity(5))
    );
    assert_eq!(
        "10em".parse::<RootMargin>(),
        Err(MarginParseError::Value("10em".to_string()))
    );
    assert_eq!("0".parse::<RootMargin>(), Ok(RootMargin::uniform_px(0.0)));

    let three: RootMargin = "1px 2% 3px".parse().unwrap();
    assert_eq!(three.left, MarginValue::Percent(2.0));
    assert_eq!(three.bottom, MarginValue::Px(3.0));
}

#[tokio::test]
async fn visibility_receiver_observes_flip() {
    let observer = observer(ObserverOptions::default());
    let element = observer.observe();
    let mut rx = element.visibility();
    element.attach(Rect::new(0.0, 2000.0, 10.0, 10.0));

    observer.set_viewport(Rect::new(0.0, 1800.0, 800.0, 600.0));

    tokio::time::timeout(Duration::from_secs(1), rx.changed())
        .await
        .expect("visibility should change")
        .unwrap();
    assert!(*rx.borrow());
}

// ====================================================================================
// LAZY IMAGE
// ====================================================================================

#[test]
fn lazy_image_latches_after_first_visibility() {
    let observer = observer(ObserverOptions::default());
    let image = LazyImage::new(&observer, "https://cdn.example/a.png", Some("blur.png".into()));

    image.attach(Rect::new(0.0, 1200.0, 100.0, 100.0));
    assert_eq!(image.current_src(), Some("blur.png"));

    observer.set_viewport(Rect::new(0.0, 1000.0, 800.0, 600.0));
    assert_eq!(image.current_src(), Some("https://cdn.example/a.png"));

    observer.set_viewport(VIEWPORT);
    assert!(!image.element().is_visible());
    assert_eq!(image.current_src(), Some("https://cdn.example/a.png"));
}

#[tokio::test]
async fn lazy_image_wait_resolves_on_scroll() {
    let observer = observer(ObserverOptions::default());
    let image = LazyImage::new(&observer, "a.png", None);
    image.attach(Rect::new(0.0, 1200.0, 100.0, 100.0));
    assert_eq!(image.current_src(), None);

    let scroller = observer.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        scroller.set_viewport(Rect::new(0.0, 1000.0, 800.0, 600.0));
    });

    tokio::time::timeout(Duration::from_secs(1), image.wait_until_visible())
        .await
        .expect("image should become visible");
    assert!(image.should_load());
}
