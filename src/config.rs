use std::{fmt, sync::Arc};

type Callback = Arc<dyn Fn() + Send + Sync + 'static>;

/// Per-primitive settings.
///
/// `name` is attached to every log record the primitive emits. The park hooks
/// run on the waiting thread right before it blocks and right after it wakes
/// up, always outside the primitive's monitor.
#[derive(Clone)]
pub struct Config {
    pub name: Arc<str>,
    pub on_park: Callback,
    pub on_unpark: Callback,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config").field("name", &self.name).finish()
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    pub(crate) fn named(name: &str) -> Self {
        ConfigBuilder::default().build_or(name)
    }
}

#[derive(Default)]
pub struct ConfigBuilder {
    pub name: Option<Arc<str>>,
    pub on_park: Option<Callback>,
    pub on_unpark: Option<Callback>,
}

impl ConfigBuilder {
    pub fn name(&mut self, name: impl Into<Arc<str>>) -> &mut Self {
        self.name = Some(name.into());
        self
    }

    pub fn on_park(&mut self, callback: impl Fn() + Send + Sync + 'static) -> &mut Self {
        self.on_park = Some(Arc::new(callback));
        self
    }

    pub fn on_unpark(&mut self, callback: impl Fn() + Send + Sync + 'static) -> &mut Self {
        self.on_unpark = Some(Arc::new(callback));
        self
    }

    pub fn build(&self) -> Config {
        self.build_or("ksync")
    }

    fn build_or(&self, default_name: &str) -> Config {
        Config {
            name: self
                .name
                .as_ref()
                .cloned()
                .unwrap_or_else(|| Arc::from(default_name)),
            on_park: self
                .on_park
                .as_ref()
                .cloned()
                .unwrap_or_else(|| Arc::new(|| {})),
            on_unpark: self
                .on_unpark
                .as_ref()
                .cloned()
                .unwrap_or_else(|| Arc::new(|| {})),
        }
    }
}
