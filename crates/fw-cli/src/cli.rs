use std::path::PathBuf;

use clap::{Parser, Subcommand};
use fw_tensor::ByteOrder;

#[derive(Parser, Debug)]
#[command(name = "forwarder", version, about = "Run models on interchangeable backends")]
pub struct Cli {
    /// Log filter, used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check every backend against golden fixtures
    Verify {
        /// Path to the model description
        #[arg(long)]
        model: PathBuf,

        /// Directory holding test_data_set_<n>/{input_0,output_0}.pb
        #[arg(long)]
        fixtures: PathBuf,

        /// Model input the fixture input is fed to
        #[arg(long, default_value = "Input3")]
        input_name: String,

        /// Model output compared against the fixture output
        #[arg(long, default_value = "Plus214_Output_0")]
        output_name: String,

        /// Backend id to run (repeatable)
        #[arg(long = "backend", default_values_t = [String::from("cpu"), String::from("cpu-f64")])]
        backends: Vec<String>,

        /// Largest accepted absolute difference per element
        #[arg(long, default_value_t = 0.001)]
        tolerance: f64,

        /// In-memory byte order (little, big or native)
        #[arg(long, default_value = "native")]
        byte_order: ByteOrder,

        /// Log fed and produced tensors
        #[arg(long)]
        debug: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Classify one image file
    Predict {
        /// Path to the model description
        #[arg(long)]
        model: PathBuf,

        /// Image file (PNG, JPEG, BMP or GIF)
        #[arg(long)]
        image: PathBuf,

        /// The image file holds base64 text instead of raw image bytes
        #[arg(long)]
        base64: bool,

        /// Backend id to run on
        #[arg(long, default_value = "cpu")]
        backend: String,

        #[arg(long, default_value = "Input3")]
        input_name: String,

        #[arg(long, default_value = "Plus214_Output_0")]
        output_name: String,

        /// Target width in pixels
        #[arg(long, default_value_t = 28)]
        width: u32,

        /// Target height in pixels
        #[arg(long, default_value_t = 28)]
        height: u32,
    },
}
