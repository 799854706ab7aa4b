extern crate xmlbin;
#[macro_use] extern crate pretty_assertions;

use xmlbin::*;

fn round_trip(node: &Node) -> Node {
    let data = node.to_bytes().unwrap();
    Node::from_bytes(&data).unwrap()
}

fn sample() -> Node {
    Node::new("project")
        .with_attribute("version", "4")
        .with_child(
            Node::new("component")
                .with_attribute("name", "ProjectRootManager")
                .with_attribute("project-jdk-name", "1.8")
                .with_child(Node::new("output").with_attribute("url", "file://$PROJECT_DIR$/out"))
        )
        .with_text("  mixed  ")
        .with_child(
            Node::new("script")
                .with_cdata("if (a < b && c) {}")
                .with_cdata("   ")
        )
        .with_text("tail")
}

// Builds a tree where each level has `branches` children,
// but only the first one goes deeper.
fn deep_tree(depth: usize, branches: usize) -> Node {
    let mut node = Node::new(format!("level{}", depth)).with_text("leaf");
    for level in (0..depth).rev() {
        let mut parent = Node::new(format!("level{}", level))
            .with_attribute("depth", level.to_string());
        parent.push_element(node);
        for i in 1..branches {
            parent.push_element(Node::new("sibling").with_attribute("n", i.to_string()));
            parent.push_text(format!("text {}", i));
        }
        node = parent;
    }

    node
}

#[test]
fn round_trip_01() {
    let node = sample();
    assert_eq!(round_trip(&node), node);
}

#[test]
fn round_trip_attributes_order() {
    let node = Node::new("e")
        .with_attribute("z", "1")
        .with_attribute("a", "2")
        .with_attribute("m", "3");

    let names: Vec<_> = round_trip(&node).attributes().iter().map(|a| a.name().to_string()).collect();
    assert_eq!(names, ["z", "a", "m"]);
}

#[test]
fn whitespace_text_is_dropped() {
    let node = Node::new("e")
        .with_text("   \t\n")
        .with_child(Node::new("c"))
        .with_text("  a  ");

    let expected = Node::new("e")
        .with_child(Node::new("c"))
        .with_text("  a  ");

    assert_eq!(round_trip(&node), expected);
}

#[test]
fn whitespace_cdata_is_kept() {
    let node = Node::new("e").with_cdata("   ").with_cdata("");
    assert_eq!(round_trip(&node), node);
}

#[test]
fn attributes_limit() {
    let mut node = Node::new("e");
    for i in 0..255 {
        node.set_attribute(format!("attr{}", i), i.to_string());
    }

    let data = node.to_bytes().unwrap();
    assert_eq!(data[3], 255);
    assert_eq!(Node::from_bytes(&data).unwrap(), node);

    node.set_attribute("attr255", "255");
    let err = node.to_bytes().unwrap_err();
    assert!(err.is_unsupported_format());
}

#[test]
fn attributes_limit_nested() {
    let mut child = Node::new("child");
    for i in 0..300 {
        child.set_attribute(format!("attr{}", i), "");
    }

    let node = Node::new("root").with_child(child);
    match node.to_bytes() {
        Err(Error::UnsupportedFormat(FormatError::TooManyAttributes(ref name, 300))) => {
            assert_eq!(name, "child");
        }
        v => panic!("unexpected result: {:?}", v),
    }
}

#[test]
fn truncation() {
    let data = sample().to_bytes().unwrap();
    assert_eq!(data.last(), Some(&3));

    for len in 0..data.len() {
        match Node::from_bytes(&data[..len]) {
            Err(Error::MalformedStream(_)) => {}
            v => panic!("a stream truncated to {} bytes was decoded as {:?}", len, v),
        }
    }
}

#[test]
fn nesting() {
    let node = deep_tree(50, 3);
    assert_eq!(node.descendants().count(), 1 + 50 * 3);
    assert_eq!(round_trip(&node), node);
}

#[test]
fn deep_nesting() {
    let mut node = Node::new("e");
    for _ in 0..1000 {
        node = Node::new("e").with_child(node);
    }

    assert_eq!(round_trip(&node), node);
}

// A root `e` element followed by `levels` nested `e` elements
// and `closed` `ELEMENT_END` tags.
fn nested_stream(levels: usize, closed: usize) -> Vec<u8> {
    let mut data = b"\x00\x01e\x00".to_vec();
    for _ in 0..levels {
        data.extend_from_slice(b"\x00\x00\x01e\x00");
    }

    data.extend(std::iter::repeat(3).take(closed));
    data
}

#[test]
fn max_depth() {
    let data = nested_stream(codec::MAX_DEPTH, codec::MAX_DEPTH + 1);

    let node = Node::from_bytes(&data).unwrap();
    assert_eq!(node.descendants().count(), codec::MAX_DEPTH + 1);
    assert_eq!(node.to_bytes().unwrap(), data);
}

#[test]
fn too_deep_stream() {
    let data = nested_stream(100_000, 100_001);
    match Node::from_bytes(&data) {
        Err(Error::MalformedStream(StreamError::TooDeep(_))) => {}
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("a stream with 100000 levels was decoded"),
    }
}

#[test]
fn too_deep_truncated_stream() {
    let data = nested_stream(100_000, 99_999);
    match Node::from_bytes(&data[..data.len() - 1]) {
        Err(Error::MalformedStream(StreamError::TooDeep(_))) => {}
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("a truncated stream was decoded"),
    }
}

#[test]
fn too_deep_tree() {
    let mut node = Node::new("e");
    for _ in 0..codec::MAX_DEPTH {
        node = Node::new("e").with_child(node);
    }
    assert!(node.to_bytes().is_ok());

    let node = Node::new("root").with_child(node);
    match node.to_bytes() {
        Err(Error::UnsupportedFormat(FormatError::TooDeep(ref name))) => assert_eq!(name, "e"),
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("a tree deeper than the limit was encoded"),
    }
}

#[test]
fn empty_node() {
    let node = Node::new("e");
    let data = node.to_bytes().unwrap();

    assert_eq!(data, [0x00, 0x01, b'e', 0x00, 0x03]);
    assert_eq!(round_trip(&node), node);
}

#[test]
fn encode_to_writer() {
    let node = sample();

    let mut data = Vec::new();
    write_node(&node, &mut data).unwrap();
    assert_eq!(data, node.to_bytes().unwrap());

    let mut input = data.as_slice();
    assert_eq!(read_node(&mut input).unwrap(), node);
}

#[test]
fn sequence_of_nodes() {
    let nodes = vec![sample(), Node::new("a"), deep_tree(3, 2)];

    let mut data = Vec::new();
    for node in &nodes {
        node.encode(&mut data).unwrap();
    }

    let mut input = data.as_slice();
    for node in &nodes {
        assert_eq!(&Node::decode(&mut input).unwrap(), node);
    }
    assert!(input.is_empty());
}

#[test]
fn parse_then_encode() {
    let text = "\
<root>
    <item id='1'>First</item>
    <item id='2'><![CDATA[ <raw> ]]></item>
</root>
";

    let node = Node::parse(text).unwrap();
    let expected = Node::new("root")
        .with_child(Node::new("item").with_attribute("id", "1").with_text("First"))
        .with_child(Node::new("item").with_attribute("id", "2").with_cdata(" <raw> "));

    assert_eq!(round_trip(&node), expected);
}

#[test]
fn binary_is_smaller() {
    let text = "\
<component name='ProjectRunConfigurationManager'>
  <configuration default='false' name='Tests' type='JUnit'>
    <module name='core' />
    <option name='PACKAGE_NAME' value='com.example' />
    <option name='MAIN_CLASS_NAME' value='' />
    <method v='2'>
      <option name='Make' enabled='true' />
    </method>
  </configuration>
</component>
";

    let data = Node::parse(text).unwrap().to_bytes().unwrap();
    assert!(data.len() < text.len());
}
