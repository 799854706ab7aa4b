extern crate env_logger;
extern crate xmlbin;

use std::fs;
use std::io::BufWriter;
use std::process;

fn main() {
    env_logger::init();

    let args: Vec<_> = std::env::args().collect();

    if args.len() != 3 {
        println!("Usage:\n\tcargo run --example xml2bin -- input.xml output.bin");
        process::exit(1);
    }

    let text = fs::read_to_string(&args[1]).unwrap();

    let node = match xmlbin::Node::parse(&text) {
        Ok(v) => v,
        Err(e) => {
            println!("Error: {}.", e);
            process::exit(1);
        }
    };

    let file = BufWriter::new(fs::File::create(&args[2]).unwrap());
    if let Err(e) = node.encode(file) {
        println!("Error: {}.", e);
        process::exit(1);
    }

    let size = fs::metadata(&args[2]).unwrap().len();
    println!("XML: {} bytes, binary: {} bytes.", text.len(), size);
}
