use super::tag::Tag;
use super::{block, kind, FifError, FifResult};

// ---------------------------------------------------------------------------
// Block tree
// ---------------------------------------------------------------------------

/// One block of the file: its own tags (start/end markers excluded) and
/// nested child blocks, both in file order.
#[derive(Debug, Clone)]
pub struct Node<'a> {
    pub block: i32,
    pub tags: Vec<Tag<'a>>,
    pub children: Vec<Node<'a>>,
}

impl<'a> Node<'a> {
    fn new(block: i32) -> Self {
        Self {
            block,
            tags: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Assemble the flat tag list into a tree rooted at a synthetic root block.
    pub fn build(tags: &[Tag<'a>]) -> FifResult<Node<'a>> {
        let mut stack = vec![Node::new(block::ROOT)];

        for tag in tags {
            match tag.kind {
                kind::BLOCK_START => stack.push(Node::new(tag.as_i32()?)),
                kind::BLOCK_END => {
                    let closing = tag.as_i32()?;
                    if stack.len() < 2 {
                        return Err(FifError::Malformed(format!(
                            "block end {closing} at {} without a matching start",
                            tag.pos
                        )));
                    }
                    let node = stack.pop().ok_or_else(|| {
                        FifError::Malformed("block stack underflow".to_string())
                    })?;
                    if node.block != closing {
                        return Err(FifError::Malformed(format!(
                            "block {} closed by end tag for block {closing} at {}",
                            node.block, tag.pos
                        )));
                    }
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(node);
                    }
                }
                _ => {
                    if let Some(current) = stack.last_mut() {
                        current.tags.push(*tag);
                    }
                }
            }
        }

        if stack.len() != 1 {
            let open: Vec<i32> = stack.iter().skip(1).map(|n| n.block).collect();
            return Err(FifError::Malformed(format!(
                "unterminated block(s) {open:?}"
            )));
        }
        stack
            .pop()
            .ok_or_else(|| FifError::Malformed("empty block tree".to_string()))
    }

    /// First tag of the given kind directly in this block.
    pub fn tag(&self, kind: i32) -> Option<&Tag<'a>> {
        self.tags.iter().find(|t| t.kind == kind)
    }

    /// All tags of the given kind directly in this block.
    pub fn tags_of(&self, kind: i32) -> impl Iterator<Item = &Tag<'a>> {
        self.tags.iter().filter(move |t| t.kind == kind)
    }

    /// Depth-first search for the first block of the given kind, this block included.
    pub fn find_block(&self, block: i32) -> Option<&Node<'a>> {
        if self.block == block {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find_block(block))
    }

    /// Depth-first list of all blocks of the given kind.
    pub fn find_blocks(&self, block: i32) -> Vec<&Node<'a>> {
        let mut out = Vec::new();
        self.collect_blocks(block, &mut out);
        out
    }

    fn collect_blocks<'n>(&'n self, block: i32, out: &mut Vec<&'n Node<'a>>) {
        if self.block == block {
            out.push(self);
        }
        for child in &self.children {
            child.collect_blocks(block, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fiff::tag::read_tags;
    use crate::data::fiff::write::FifWriter;

    #[test]
    fn test_nested_blocks() {
        let mut w = FifWriter::new(Vec::new()).unwrap();
        w.start_block(block::MEAS).unwrap();
        w.start_block(block::MEAS_INFO).unwrap();
        w.write_i32(kind::NCHAN, 3).unwrap();
        w.end_block().unwrap();
        w.start_block(block::RAW_DATA).unwrap();
        w.write_i32(kind::FIRST_SAMPLE, 10).unwrap();
        w.end_block().unwrap();
        w.end_block().unwrap();
        let bytes = w.finish().unwrap();

        let tags = read_tags(&bytes).unwrap();
        let root = Node::build(&tags).unwrap();
        assert_eq!(root.block, block::ROOT);
        // file id, dir pointer and trailing nop live in the root
        assert_eq!(root.tags.len(), 3);

        let meas = root.find_block(block::MEAS).unwrap();
        assert_eq!(meas.children.len(), 2);
        let info = meas.find_block(block::MEAS_INFO).unwrap();
        assert_eq!(info.tag(kind::NCHAN).unwrap().as_i32().unwrap(), 3);
        let raw = root.find_block(block::RAW_DATA).unwrap();
        assert_eq!(raw.tag(kind::FIRST_SAMPLE).unwrap().as_i32().unwrap(), 10);
        assert_eq!(root.find_blocks(block::RAW_DATA).len(), 1);
        assert!(root.find_block(block::MNE_ANNOTATIONS).is_none());
    }

    #[test]
    fn test_unterminated_block() {
        let mut w = FifWriter::new(Vec::new()).unwrap();
        w.start_block(block::MEAS).unwrap();
        // bypass the writer's own balance check
        let bytes = w.finish_unchecked().unwrap();
        let tags = read_tags(&bytes).unwrap();
        assert!(matches!(Node::build(&tags), Err(FifError::Malformed(_))));
    }

    #[test]
    fn test_stray_block_end() {
        let mut w = FifWriter::new(Vec::new()).unwrap();
        w.write_i32(kind::BLOCK_END, block::MEAS).unwrap();
        let bytes = w.finish().unwrap();
        let tags = read_tags(&bytes).unwrap();
        assert!(matches!(Node::build(&tags), Err(FifError::Malformed(_))));
    }
}
