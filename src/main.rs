use std::env;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::time::Instant;

use log::{debug, error, info};

use restaurant_huffman::config::{Config, USAGE};
use restaurant_huffman::restaurant::Restaurant;

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let program = args.first().map_or("restaurant", String::as_str);

    let config = match Config::from_args(args.get(1..).unwrap_or_default()) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            eprintln!("Usage: {} {}", program, USAGE);
            std::process::exit(1);
        }
    };

    info!("--- Start Simulation ---");
    debug!("Weight mode: {}", config.weight_mode);

    let input = match fs::read_to_string(&config.input_file) {
        Ok(input) => input,
        Err(e) => {
            error!("Failed to read {}: {}", config.input_file.display(), e);
            std::process::exit(1);
        }
    };
    debug!("Command stream size: {} bytes", input.len());

    let start_time = Instant::now();
    let mut restaurant = Restaurant::new(config.weight_mode);
    let mut out = BufWriter::new(io::stdout().lock());

    let result = restaurant.run(&input, &mut out);
    if let Err(e) = out.flush() {
        error!("Could not write output: {}", e);
        std::process::exit(1);
    }

    match result {
        Ok(executed) => {
            debug!(
                "Replayed {} commands in {:.2?}.",
                executed,
                start_time.elapsed()
            );
        }
        Err(e) => {
            error!("Command stream aborted: {}", e);
            std::process::exit(1);
        }
    }

    info!("--- End ---");
}
