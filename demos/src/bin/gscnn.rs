//! Gated Shape CNN head demo.
//!
//! Runs the two-stream head on an image (or random noise) with synthetic
//! backbone activations and writes the predicted boundary map.
//!
//! ## Usage
//!
//! ```bash
//! # Forward a random batch with the default configuration
//! cargo run --bin gscnn -- forward
//!
//! # Forward an image and save the boundary and edge maps
//! cargo run --bin gscnn -- forward --image photo.jpg --output outputs/
//!
//! # Print a default configuration for 512x512 inputs
//! cargo run --bin gscnn -- config --size 512 > gscnn.json
//!
//! # Use it
//! cargo run --bin gscnn -- forward --config gscnn.json
//! ```

use std::{fs, path::PathBuf, time::Instant};

use anyhow::{Context, Result};
use burn::{prelude::*, tensor::Distribution};
use clap::{Parser, Subcommand};
use gscnn_burn::{GatedScnn, ASPP_INTERMEDIATE_CHANNELS, ASPP_REDUCED_CHANNELS};
use gscnn_demos::{
    common::{
        backend_name, create_device,
        image::{load_image, save_map},
        synthetic::synthetic_input,
        SelectedBackend, SelectedDevice,
    },
    DemoConfig,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a forward pass and report output shapes
    Forward {
        /// Configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Input image; random noise when omitted
        #[arg(short, long)]
        image: Option<PathBuf>,

        /// Square image size used when no configuration file is given
        #[arg(long, default_value = "256")]
        size: usize,

        /// Override the configured batch size
        #[arg(short, long)]
        batch: Option<usize>,

        /// Override the configured random seed
        #[arg(long)]
        seed: Option<u64>,

        /// Output directory for the boundary and edge maps
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print a default configuration as JSON
    Config {
        /// Square image size
        #[arg(long, default_value = "256")]
        size: usize,
    },
    /// Print backend and architecture information
    Info,
}

fn main() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Command::Forward {
            config,
            image,
            size,
            batch,
            seed,
            output,
        } => {
            let mut config = match config {
                Some(path) => DemoConfig::load(path)?,
                None => DemoConfig::new(size),
            };
            if let Some(batch) = batch {
                config.batch_size = batch;
            }
            if let Some(seed) = seed {
                config.seed = seed;
            }
            config.validate()?;

            forward(&config, image, output)
        }
        Command::Config { size } => {
            let config = DemoConfig::new(size);
            config.validate()?;
            let json = serde_json::to_string_pretty(&config)
                .context("Failed to serialize configuration")?;
            println!("{json}");
            Ok(())
        }
        Command::Info => {
            info();
            Ok(())
        }
    }
}

fn forward(config: &DemoConfig, image: Option<PathBuf>, output: Option<PathBuf>) -> Result<()> {
    let device = create_device();
    SelectedBackend::seed(config.seed);
    println!("Using backend: {}", backend_name());

    let images = input_images(config, image, &device)?;
    println!("Input batch: {:?}", images.dims());

    let model: GatedScnn<SelectedBackend> = config
        .model
        .init(&device)
        .context("Failed to initialize model")?;

    let input = synthetic_input(config, images);
    let edges = input.edges.clone();

    let start = Instant::now();
    let result = model.forward(input).context("Forward pass failed")?;
    let elapsed = start.elapsed();

    println!("Boundary:        {:?}", result.boundary.dims());
    println!("Shape attention: {:?}", result.shape_attention.dims());
    println!("Features:        {:?}", result.features.dims());
    println!("Forward pass took {:.2?}", elapsed);

    if let Some(output) = output {
        fs::create_dir_all(&output).with_context(|| {
            format!("Failed to create output directory: {}", output.display())
        })?;
        for index in 0..config.batch_size {
            save_map(
                result.boundary.clone(),
                index,
                output.join(format!("boundary_{index}.png")),
            )?;
            save_map(edges.clone(), index, output.join(format!("edges_{index}.png")))?;
        }
        println!("Maps saved to {}", output.display());
    }

    Ok(())
}

fn input_images(
    config: &DemoConfig,
    image: Option<PathBuf>,
    device: &SelectedDevice,
) -> Result<Tensor<SelectedBackend, 4>> {
    let [height, width] = config.image_size();

    match image {
        Some(path) => {
            let image = load_image::<SelectedBackend, _>(&path, device)?;
            let image = gscnn_burn::ResizeConfig::new(height, width)
                .init()
                .forward(image);
            Ok(image.repeat_dim(0, config.batch_size))
        }
        None => Ok(Tensor::random(
            [config.batch_size, 3, height, width],
            Distribution::Uniform(0.0, 1.0),
            device,
        )),
    }
}

fn info() {
    let config = DemoConfig::default();
    let model = &config.model;

    println!("Backend: {}", backend_name());
    println!();
    println!("Shape stream");
    println!(
        "  input channels:  {:?}",
        model.shape_stream.attention.in_channels
    );
    println!(
        "  tower size:      {}x{}",
        model.shape_stream.attention.height, model.shape_stream.attention.width
    );
    println!("  edge channels:   {}", model.shape_stream.edge_channels);
    println!("Atrous pyramid pooling");
    println!("  input channels:  {}", model.aspp.in_channels);
    println!("  rates:           {:?}", model.aspp.rates);
    println!(
        "  output channels: {} + {}",
        ASPP_REDUCED_CHANNELS, ASPP_INTERMEDIATE_CHANNELS
    );
    println!("Final layer");
    println!("  output size:     {}x{}", model.head.height, model.head.width);
    println!("  channels:        {}", model.head.channels);
}
