extern crate env_logger;
extern crate xmlbin;

use std::collections::HashSet;
use std::fs;
use std::env;
use std::process;

use xmlbin::{Content, Node};

fn main() {
    env_logger::init();

    let args: Vec<_> = env::args().collect();

    if args.len() != 2 {
        println!("Usage:\n\tcargo run --example stats -- input.xml");
        process::exit(1);
    }

    let text = fs::read_to_string(&args[1]).unwrap();
    let root = match Node::parse(&text) {
        Ok(v) => v,
        Err(e) => {
            println!("Error: {}.", e);
            process::exit(1);
        }
    };

    println!("Elements count: {}", root.descendants().count());

    let attrs_count: usize = root.descendants().map(|n| n.attributes().len()).sum();
    println!("Attributes count: {}", attrs_count);

    let names: HashSet<_> = root.descendants().map(|n| n.name()).collect();
    println!("Unique element names count: {}", names.len());

    let content = || root.descendants().flat_map(|n| n.content());
    println!("Text items count: {}", content().filter(|c| c.is_text()).count());
    println!("Whitespace-only text items count: {}",
             content().filter(|c| c.is_whitespace_text()).count());
    println!("CDATA items count: {}",
             content().filter(|c| match c { Content::CData(_) => true, _ => false }).count());

    match root.to_bytes() {
        Ok(data) => println!("Binary size: {} bytes (XML: {} bytes)", data.len(), text.len()),
        Err(e) => println!("Cannot be encoded: {}.", e),
    }
}
