use fw_tensor::ByteOrder;

/// Settings applied when a model is loaded and its sessions run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Byte order of every tensor a session hands back.
    pub memory_byte_order: ByteOrder,
    /// Log fed and produced tensors at debug level.
    pub debug: bool,
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            memory_byte_order: ByteOrder::native(),
            debug: false,
        }
    }
}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn memory_byte_order(mut self, order: ByteOrder) -> Self {
        self.config.memory_byte_order = order;
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
