//! One page load: every world wired to the same document and window.

use std::future::Future;
use std::rc::Rc;

use crate::bridge::{BridgeClient, Window};
use crate::config::Config;
use crate::dom::Dom;
use crate::engine::{FeatureEngine, Registry};
use crate::error::ExtrasResult;
use crate::features::{self, FeatureContext, LocalTasks};
use crate::page::{FrameworkPropsReader, ReactPropsReader};
use crate::storage::PreferenceStore;
use crate::worlds::{Background, DownloadHost, Mediator, PageWorld};

/// A loaded page with the extension attached.
#[derive(Debug)]
pub struct Session {
    dom: Dom,
    window: Window,
    engine: FeatureEngine,
    background: Rc<Background>,
    tasks: LocalTasks,
    _page_world: PageWorld,
    _mediator: Mediator,
}

impl Session {
    /// Attach to `dom` with React props access.
    pub fn start(
        config: &Config,
        dom: Dom,
        store: PreferenceStore,
        downloads: impl DownloadHost + 'static,
    ) -> ExtrasResult<Self> {
        Self::start_with_props(config, dom, store, downloads, Rc::new(ReactPropsReader::new()))
    }

    pub fn start_with_props(
        config: &Config,
        dom: Dom,
        store: PreferenceStore,
        downloads: impl DownloadHost + 'static,
        props: Rc<dyn FrameworkPropsReader>,
    ) -> ExtrasResult<Self> {
        let window = Window::new();
        let timeout = config.bridge.request_timeout();

        let mut background = Background::new(downloads);
        background.on_installed(&config.site.origins);
        let background = Rc::new(background);
        let mediator = Mediator::install(&window, Rc::clone(&background));

        let page_world = PageWorld::install(
            dom.clone(),
            BridgeClient::new(window.clone(), timeout),
            Rc::clone(&props),
        );

        let tasks = LocalTasks::new();
        let ctx = FeatureContext {
            dom: dom.clone(),
            bridge: BridgeClient::new(window.clone(), timeout),
            props,
            tasks: tasks.clone(),
        };
        let registry = Registry::new(features::builtin(&ctx))?;
        let engine = FeatureEngine::new(registry, store, dom.clone(), &config.engine);
        engine.start();

        Ok(Self {
            dom,
            window,
            engine,
            background,
            tasks,
            _page_world: page_world,
            _mediator: mediator,
        })
    }

    pub fn dom(&self) -> &Dom {
        &self.dom
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn engine(&self) -> &FeatureEngine {
        &self.engine
    }

    pub fn store(&self) -> &PreferenceStore {
        self.engine.store()
    }

    pub fn background(&self) -> &Background {
        &self.background
    }

    /// Work queued by feature event handlers.
    pub fn tasks(&self) -> &LocalTasks {
        &self.tasks
    }

    /// Drive `future` while queued feature work, such as a download started
    /// from a menu click, makes progress.
    pub async fn run_tasks<F: Future>(&self, future: F) -> F::Output {
        self.tasks.run_until(future).await
    }

    /// Deliver pending DOM insertions to the features.
    pub fn flush_mutations(&self) -> usize {
        self.engine.flush_mutations()
    }
}
