/// Which bucket of a multi-group section is expanded. At most one at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupSelector {
    groups: usize,
    expanded: Option<usize>,
}

impl GroupSelector {
    pub fn new(groups: usize) -> Self {
        Self {
            groups,
            expanded: None,
        }
    }

    pub fn expanded(&self) -> Option<usize> {
        self.expanded
    }

    pub fn is_expanded(&self, group: usize) -> bool {
        self.expanded == Some(group)
    }

    /// Expands `group`, or collapses it if it is already open. Unknown groups are ignored.
    pub fn toggle(&mut self, group: usize) {
        if group >= self.groups {
            return;
        }
        self.expanded = if self.expanded == Some(group) {
            None
        } else {
            Some(group)
        };
    }

    pub fn collapse(&mut self) {
        self.expanded = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_group_open_at_a_time() {
        let mut selector = GroupSelector::new(4);
        selector.toggle(1);
        assert!(selector.is_expanded(1));
        selector.toggle(3);
        assert_eq!(selector.expanded(), Some(3));
        selector.toggle(3);
        assert_eq!(selector.expanded(), None);
    }

    #[test]
    fn out_of_range_is_ignored() {
        let mut selector = GroupSelector::new(2);
        selector.toggle(0);
        selector.toggle(5);
        assert_eq!(selector.expanded(), Some(0));
        selector.collapse();
        assert_eq!(selector.expanded(), None);
    }
}
