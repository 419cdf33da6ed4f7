// Integration tests for the script loader against the in-memory page

use std::sync::Arc;

use mapview_loader::{
    LoadState, LoaderError, LoaderEvent, MemoryPage, Page, ResourceLoadFailure, ScriptElement,
    ScriptLoader, ScriptSrc,
};
use tokio::sync::mpsc::{self, UnboundedReceiver};

const SDK: &str = "https://example.com/sdk.js";
const OTHER_SDK: &str = "https://example.com/other.js";

fn src(url: &str) -> ScriptSrc {
    ScriptSrc::new(url).unwrap()
}

fn drain(events: &mut UnboundedReceiver<LoaderEvent>) -> Vec<LoaderEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}

#[tokio::test]
async fn test_fresh_url_injects_once_and_becomes_ready_on_load() {
    let page = Arc::new(MemoryPage::new());
    let mut loader = ScriptLoader::new(Arc::clone(&page));

    let readiness = loader.load(SDK).unwrap();

    // One handle, not ready until the page reports the load
    assert_eq!(page.script_count(SDK), 1);
    assert!(!readiness.is_ready());
    assert_eq!(readiness.state(), LoadState::Loading);

    let handle = loader.handle().unwrap();
    let element = page.element(handle).unwrap();
    assert_eq!(element.src, src(SDK));
    assert!(element.async_load);

    assert_eq!(page.finish_loading(SDK), 1);
    assert!(readiness.is_ready());
    assert!(readiness.wait_ready().await);
}

#[tokio::test]
async fn test_readiness_transitions_exactly_once() {
    let (tx, mut events) = mpsc::unbounded_channel();
    let page = Arc::new(MemoryPage::new());
    let mut loader = ScriptLoader::with_events(Arc::clone(&page), tx);

    let readiness = loader.load(SDK).unwrap();
    let handle = loader.handle().unwrap();

    assert!(page.complete(handle, Ok(())));
    // A second report for the same element has nothing left to resolve
    assert!(!page.complete(handle, Err(ResourceLoadFailure::NotFound)));
    assert_eq!(page.finish_loading(SDK), 0);

    assert_eq!(readiness.state(), LoadState::Ready);
    assert_eq!(
        drain(&mut events),
        vec![
            LoaderEvent::Injected {
                src: src(SDK),
                handle
            },
            LoaderEvent::Ready { src: src(SDK) },
        ]
    );
}

#[tokio::test]
async fn test_existing_script_is_reused_without_waiting() {
    let (tx, mut events) = mpsc::unbounded_channel();
    let page = Arc::new(MemoryPage::new());
    let existing = page.insert_existing(src(SDK));

    let mut loader = ScriptLoader::with_events(Arc::clone(&page), tx);
    let readiness = loader.load(SDK).unwrap();

    // No duplicate handle and no load event needed
    assert_eq!(page.script_count(SDK), 1);
    assert_eq!(loader.handle(), Some(existing));
    assert!(readiness.is_ready());
    assert_eq!(
        drain(&mut events),
        vec![
            LoaderEvent::Reused {
                src: src(SDK),
                handle: existing
            },
            LoaderEvent::Ready { src: src(SDK) },
        ]
    );
}

#[tokio::test]
async fn test_second_loader_reuses_injected_script() {
    let page = Arc::new(MemoryPage::new());

    let mut first = ScriptLoader::new(Arc::clone(&page));
    let first_readiness = first.load(SDK).unwrap();

    let mut second = ScriptLoader::new(Arc::clone(&page));
    let second_readiness = second.load(SDK).unwrap();

    assert_eq!(page.script_count(SDK), 1);
    assert_eq!(first.handle(), second.handle());
    assert!(second_readiness.is_ready());
    assert!(!first_readiness.is_ready());
}

#[tokio::test]
async fn test_repeated_load_with_same_url_is_idempotent() {
    let page = Arc::new(MemoryPage::new());
    let mut loader = ScriptLoader::new(Arc::clone(&page));

    let first = loader.load(SDK).unwrap();
    let second = loader.load(SDK).unwrap();
    assert_eq!(page.script_count(SDK), 1);

    page.finish_loading(SDK);
    assert!(first.is_ready());
    assert!(second.is_ready());
}

#[tokio::test]
async fn test_failure_leaves_readiness_false_and_reports_once() {
    let (tx, mut events) = mpsc::unbounded_channel();
    let page = Arc::new(MemoryPage::new());
    let mut loader = ScriptLoader::with_events(Arc::clone(&page), tx);

    let readiness = loader.load(SDK).unwrap();
    assert_eq!(page.fail_loading(SDK, ResourceLoadFailure::Status(404)), 1);

    assert!(!readiness.is_ready());
    assert_eq!(
        readiness.settled().await,
        LoadState::Failed(ResourceLoadFailure::Status(404))
    );

    // No retry on re-invocation, and a late success cannot flip the flag
    let again = loader.load(SDK).unwrap();
    assert_eq!(page.script_count(SDK), 1);
    assert_eq!(page.finish_loading(SDK), 0);
    assert!(!again.is_ready());

    let failures: Vec<_> = drain(&mut events)
        .into_iter()
        .filter(|event| matches!(event, LoaderEvent::Failed { .. }))
        .collect();
    assert_eq!(
        failures,
        vec![LoaderEvent::Failed {
            src: src(SDK),
            failure: ResourceLoadFailure::Status(404),
        }]
    );
}

#[tokio::test]
async fn test_changed_url_is_evaluated_independently() {
    let page = Arc::new(MemoryPage::new());
    let mut loader = ScriptLoader::new(Arc::clone(&page));

    let first = loader.load(SDK).unwrap();
    page.finish_loading(SDK);
    assert!(first.is_ready());

    let second = loader.load(OTHER_SDK).unwrap();
    assert_eq!(loader.current_src(), Some(&src(OTHER_SDK)));
    assert_eq!(page.script_count(OTHER_SDK), 1);
    assert!(!second.is_ready());

    // The first script stays in the page and stays ready
    assert_eq!(page.script_count(SDK), 1);
    assert!(first.is_ready());

    page.finish_loading(OTHER_SDK);
    assert!(second.is_ready());
}

#[tokio::test]
async fn test_changed_url_back_to_present_script() {
    let page = Arc::new(MemoryPage::new());
    let mut loader = ScriptLoader::new(Arc::clone(&page));

    loader.load(SDK).unwrap();
    page.finish_loading(SDK);
    loader.load(OTHER_SDK).unwrap();

    // Switching back finds the element injected earlier
    let back = loader.load(SDK).unwrap();
    assert!(back.is_ready());
    assert_eq!(page.script_count(SDK), 1);
}

#[tokio::test]
async fn test_failed_script_stays_failed_after_switching_back() {
    let (tx, mut events) = mpsc::unbounded_channel();
    let page = Arc::new(MemoryPage::new());
    let mut loader = ScriptLoader::with_events(Arc::clone(&page), tx);

    let first = loader.load(SDK).unwrap();
    page.fail_loading(SDK, ResourceLoadFailure::NotFound);
    assert_eq!(
        first.state(),
        LoadState::Failed(ResourceLoadFailure::NotFound)
    );

    loader.load(OTHER_SDK).unwrap();
    let back = loader.load(SDK).unwrap();

    assert_eq!(page.script_count(SDK), 1);
    assert!(!back.is_ready());
    assert_eq!(
        back.settled().await,
        LoadState::Failed(ResourceLoadFailure::NotFound)
    );

    let back_events: Vec<_> = drain(&mut events)
        .into_iter()
        .filter(|event| event.src() == &src(SDK))
        .collect();
    let handle = loader.handle().unwrap();
    assert_eq!(
        back_events[back_events.len() - 2..],
        [
            LoaderEvent::Reused {
                src: src(SDK),
                handle,
            },
            LoaderEvent::Failed {
                src: src(SDK),
                failure: ResourceLoadFailure::NotFound,
            },
        ]
    );
}

#[tokio::test]
async fn test_second_loader_sees_failed_script() {
    let page = Arc::new(MemoryPage::new());

    let mut first = ScriptLoader::new(Arc::clone(&page));
    first.load(SDK).unwrap();
    page.fail_loading(SDK, ResourceLoadFailure::Status(500));

    let mut second = ScriptLoader::new(Arc::clone(&page));
    let readiness = second.load(SDK).unwrap();

    assert_eq!(page.script_count(SDK), 1);
    assert_eq!(
        readiness.state(),
        LoadState::Failed(ResourceLoadFailure::Status(500))
    );
}

#[tokio::test]
async fn test_load_element_injects_given_attributes() {
    let page = Arc::new(MemoryPage::new());
    let mut loader = ScriptLoader::new(Arc::clone(&page));

    let element = ScriptElement::new(src(SDK)).with_defer(true);
    let readiness = loader.load_element(element.clone()).unwrap();

    let handle = loader.handle().unwrap();
    assert_eq!(page.element(handle), Some(element));
    assert!(!readiness.is_ready());

    // Same URL through the plain entry point is the same invocation
    loader.load(SDK).unwrap();
    assert_eq!(page.script_count(SDK), 1);
}

#[tokio::test]
async fn test_completion_for_abandoned_url_is_ignored() {
    let (tx, mut events) = mpsc::unbounded_channel();
    let page = Arc::new(MemoryPage::new());
    let mut loader = ScriptLoader::with_events(Arc::clone(&page), tx);

    let abandoned = loader.load(SDK).unwrap();
    loader.load(OTHER_SDK).unwrap();
    drain(&mut events);

    assert_eq!(page.finish_loading(SDK), 1);
    assert!(!abandoned.is_ready());
    assert!(drain(&mut events).is_empty());
}

#[tokio::test]
async fn test_completion_after_loader_dropped_is_noop() {
    let page = Arc::new(MemoryPage::new());
    let mut loader = ScriptLoader::new(Arc::clone(&page));
    let readiness = loader.load(SDK).unwrap();
    drop(loader);

    assert_eq!(page.finish_loading(SDK), 1);
    assert!(!readiness.is_ready());
    assert_eq!(readiness.settled().await, LoadState::Loading);
}

#[tokio::test]
async fn test_remove_only_removes_injected_scripts() {
    let (tx, mut events) = mpsc::unbounded_channel();
    let page = Arc::new(MemoryPage::new());
    let existing = page.insert_existing(src(OTHER_SDK));

    let mut loader = ScriptLoader::with_events(Arc::clone(&page), tx);

    loader.load(OTHER_SDK).unwrap();
    assert!(!loader.remove());
    assert!(page.contains(existing));

    loader.load(SDK).unwrap();
    let handle = loader.handle().unwrap();
    assert!(loader.remove());
    assert!(!page.contains(handle));
    assert_eq!(loader.current_src(), None);
    assert!(drain(&mut events).contains(&LoaderEvent::Removed {
        src: src(SDK),
        handle
    }));

    // Loading again after removal injects a new element
    loader.load(SDK).unwrap();
    assert_eq!(page.script_count(SDK), 1);
    assert_ne!(loader.handle(), Some(handle));
}

#[tokio::test]
async fn test_wait_ready_resolves_from_another_task() {
    let page = Arc::new(MemoryPage::new());
    let mut loader = ScriptLoader::new(Arc::clone(&page));
    let readiness = loader.load(SDK).unwrap();

    let host = Arc::clone(&page);
    tokio::spawn(async move {
        tokio::task::yield_now().await;
        host.finish_loading(SDK);
    });

    assert!(readiness.wait_ready().await);
}

#[test]
fn test_empty_url_is_rejected() {
    let page = MemoryPage::new();
    let mut loader = ScriptLoader::new(&page);

    assert!(matches!(loader.load(""), Err(LoaderError::EmptySrc)));
    assert!(page.is_empty());
}
