//! Small object model shared by the integration tests.
#![allow(dead_code)]

use flatgraph::{FlatReader, FlatWriter, Flatten, Result, TypeTag, Unflatten};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Flatten for Point {
    fn type_tag(&self) -> TypeTag {
        Self::TYPE_TAG
    }

    fn flatten(&self, writer: &mut FlatWriter) -> Result<()> {
        writer.add_int(self.x);
        writer.add_int(self.y);
        Ok(())
    }
}

impl Unflatten for Point {
    const TYPE_TAG: TypeTag = TypeTag::new("graph::Point");

    fn unflatten(reader: &mut FlatReader) -> Result<Self> {
        Ok(Point {
            x: reader.get_int()?,
            y: reader.get_int()?,
        })
    }
}

/// A named node with an optional link to another shared node.
#[derive(Debug)]
pub struct Node {
    pub name: String,
    pub link: RefCell<Option<Rc<Node>>>,
}

impl Node {
    pub fn new(name: &str, link: Option<Rc<Node>>) -> Rc<Self> {
        Rc::new(Node {
            name: name.to_owned(),
            link: RefCell::new(link),
        })
    }

    pub fn linked(&self) -> Option<Rc<Node>> {
        self.link.borrow().clone()
    }
}

impl Flatten for Node {
    fn type_tag(&self) -> TypeTag {
        Self::TYPE_TAG
    }

    fn flatten(&self, writer: &mut FlatWriter) -> Result<()> {
        writer.add_value(&self.name)?;
        writer.add_value(&*self.link.borrow())
    }
}

impl Unflatten for Node {
    const TYPE_TAG: TypeTag = TypeTag::new("graph::Node");

    fn unflatten(reader: &mut FlatReader) -> Result<Self> {
        let name = reader.get_value::<String>()?;
        let link = reader.get_value::<Option<Rc<Node>>>()?;
        Ok(Node {
            name,
            link: RefCell::new(link),
        })
    }
}

#[derive(Debug, PartialEq)]
pub struct Circle {
    pub radius: f64,
}

impl Flatten for Circle {
    fn type_tag(&self) -> TypeTag {
        Self::TYPE_TAG
    }

    fn flatten(&self, writer: &mut FlatWriter) -> Result<()> {
        writer.add_value(&self.radius)
    }
}

impl Unflatten for Circle {
    const TYPE_TAG: TypeTag = TypeTag::new("graph::Circle");

    fn unflatten(reader: &mut FlatReader) -> Result<Self> {
        Ok(Circle {
            radius: reader.get_value()?,
        })
    }
}

#[derive(Debug, PartialEq)]
pub struct Square {
    pub side: u32,
    pub filled: bool,
}

impl Flatten for Square {
    fn type_tag(&self) -> TypeTag {
        Self::TYPE_TAG
    }

    fn flatten(&self, writer: &mut FlatWriter) -> Result<()> {
        writer.add_value(&self.side)?;
        writer.add_bool(self.filled);
        Ok(())
    }
}

impl Unflatten for Square {
    const TYPE_TAG: TypeTag = TypeTag::new("graph::Square");

    fn unflatten(reader: &mut FlatReader) -> Result<Self> {
        Ok(Square {
            side: reader.get_value()?,
            filled: reader.get_bool()?,
        })
    }
}

/// Writes two ints but only reads one back.
#[derive(Debug)]
pub struct Lossy {
    pub kept: i32,
    pub dropped: i32,
}

impl Flatten for Lossy {
    fn type_tag(&self) -> TypeTag {
        Self::TYPE_TAG
    }

    fn flatten(&self, writer: &mut FlatWriter) -> Result<()> {
        writer.add_int(self.kept);
        writer.add_int(self.dropped);
        Ok(())
    }
}

impl Unflatten for Lossy {
    const TYPE_TAG: TypeTag = TypeTag::new("graph::Lossy");

    fn unflatten(reader: &mut FlatReader) -> Result<Self> {
        Ok(Lossy {
            kept: reader.get_int()?,
            dropped: 0,
        })
    }
}
