extern crate env_logger;
extern crate xmlbin;

use std::fs;
use std::io::BufReader;
use std::process;

fn main() {
    env_logger::init();

    let args: Vec<_> = std::env::args().collect();

    if args.len() != 2 {
        println!("Usage:\n\tcargo run --example bin2xml -- input.bin");
        process::exit(1);
    }

    let file = BufReader::new(fs::File::open(&args[1]).unwrap());
    match xmlbin::Node::decode(file) {
        Ok(node) => println!("{}", node),
        Err(e) => {
            println!("Error: {}.", e);
            process::exit(1);
        }
    }
}
