#[macro_use]
extern crate afl;
extern crate xmlbin;

use xmlbin::Node;

fn main() {
    fuzz!(|data: &[u8]| {
        if let Ok(node) = Node::from_bytes(data) {
            // Anything decoded must be encodable, and the second pass must be stable.
            let encoded = node.to_bytes().unwrap();
            let decoded = Node::from_bytes(&encoded).unwrap();
            assert_eq!(decoded.to_bytes().unwrap(), encoded);
        }
    });
}
