use crate::syntax::SyntaxNode;

/// Depth-first search over a syntax tree that resumes where it left off.
///
/// Each call to [`find_next`](TagCursor::find_next) continues from the
/// previous match, so successive calls visit every node below the root at
/// most once, in document order. A matching node is returned without
/// searching its own children.
#[derive(Debug, Clone)]
pub struct TagCursor<'a> {
    /// Nodes being scanned, each with the index of the next child to look at.
    stack: Vec<(&'a SyntaxNode, usize)>,
}

impl<'a> TagCursor<'a> {
    /// Start a search over the children of `root`.
    #[must_use]
    pub fn new(root: &'a SyntaxNode) -> Self {
        Self {
            stack: vec![(root, 0)],
        }
    }

    /// Next descendant whose tag contains `label`, or `None` once exhausted.
    pub fn find_next(&mut self, label: &str) -> Option<&'a SyntaxNode> {
        loop {
            let (node, index) = self.stack.last_mut()?;
            let node: &'a SyntaxNode = *node;
            match node.children.get(*index) {
                None => {
                    self.stack.pop();
                }
                Some(child) => {
                    *index += 1;
                    if child.has_label(label) {
                        return Some(child);
                    }
                    self.stack.push((child, 0));
                }
            }
        }
    }
}
