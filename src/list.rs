use alloc::boxed::Box;
use alloc::fmt;
use core::mem;
use core::ptr::{self, NonNull};

extern crate alloc;

/// A node in the doubly linked chain.
///
/// Nodes have stable identity: the raw pointer handed out at insertion
/// remains valid until the node is removed, which is what allows the
/// eviction hands and the key index to reference positions directly.
pub struct ListNode<T> {
    /// The value stored in this node. Uses MaybeUninit to allow for sigil nodes.
    val: mem::MaybeUninit<T>,
    /// Pointer to the neighbor on the front (head) side.
    prev: *mut ListNode<T>,
    /// Pointer to the neighbor on the back (tail) side.
    next: *mut ListNode<T>,
}

impl<T> ListNode<T> {
    fn new(val: T) -> Self {
        ListNode {
            val: mem::MaybeUninit::new(val),
            prev: ptr::null_mut(),
            next: ptr::null_mut(),
        }
    }

    /// Creates a sigil (sentinel) node without initializing the value.
    fn new_sigil() -> Self {
        ListNode {
            val: mem::MaybeUninit::uninit(),
            prev: ptr::null_mut(),
            next: ptr::null_mut(),
        }
    }

    /// Borrows the value stored in this node.
    ///
    /// # Safety
    ///
    /// Must only be called on non-sigil nodes; the value is assumed
    /// initialized.
    pub unsafe fn value(&self) -> &T {
        self.val.assume_init_ref()
    }

    /// Mutably borrows the value stored in this node.
    ///
    /// # Safety
    ///
    /// Must only be called on non-sigil nodes; the value is assumed
    /// initialized.
    pub unsafe fn value_mut(&mut self) -> &mut T {
        self.val.assume_init_mut()
    }

    /// Extracts the value, consuming the node.
    ///
    /// # Safety
    ///
    /// Must only be called on non-sigil nodes; the value is assumed
    /// initialized.
    unsafe fn into_value(self) -> T {
        self.val.assume_init()
    }
}

/// An ordered sequence of entries as a doubly linked chain.
///
/// Front is the newest/hottest side, back is the eviction-candidate side.
/// Sentinel nodes (sigils) at both ends keep link surgery branch-free. The
/// list itself is unbounded; capacity belongs to the eviction controllers,
/// since the LEVER policies insert first and evict afterwards.
///
/// All operations are O(1) except `clear`. Operations that accept a raw
/// node pointer are unsafe: the caller must pass a node that is currently
/// linked into *this* list (the key index and the hand-repair invariant
/// guarantee that in the cache modules).
pub struct List<T> {
    /// Current number of items in the list.
    len: usize,
    /// Pointer to the head (front) sentinel node.
    head: *mut ListNode<T>,
    /// Pointer to the tail (back) sentinel node.
    tail: *mut ListNode<T>,
}

impl<T> List<T> {
    pub fn new() -> List<T> {
        let head = Box::into_raw(Box::new(ListNode::new_sigil()));
        let tail = Box::into_raw(Box::new(ListNode::new_sigil()));

        let list = List { len: 0, head, tail };

        unsafe {
            // SAFETY: head and tail are newly allocated and valid pointers
            (*list.head).next = list.tail;
            (*list.tail).prev = list.head;
        }

        list
    }

    /// Returns the current number of items in the list.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the list contains no items.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the front (newest) node, or null if the list is empty.
    pub fn front(&self) -> *mut ListNode<T> {
        let first = unsafe { (*self.head).next };
        if first == self.tail {
            ptr::null_mut()
        } else {
            first
        }
    }

    /// Returns the back (oldest) node, or null if the list is empty.
    pub fn back(&self) -> *mut ListNode<T> {
        let last = unsafe { (*self.tail).prev };
        if last == self.head {
            ptr::null_mut()
        } else {
            last
        }
    }

    /// Returns the neighbor on the front side of `node`, or null when
    /// `node` is the front. This is the direction the eviction hands walk.
    ///
    /// # Safety
    ///
    /// `node` must be a valid node currently linked into this list.
    pub unsafe fn prev(&self, node: *mut ListNode<T>) -> *mut ListNode<T> {
        let p = (*node).prev;
        if p == self.head {
            ptr::null_mut()
        } else {
            p
        }
    }

    /// Returns the neighbor on the back side of `node`, or null when `node`
    /// is the back.
    ///
    /// # Safety
    ///
    /// `node` must be a valid node currently linked into this list.
    #[allow(dead_code)]
    pub unsafe fn next(&self, node: *mut ListNode<T>) -> *mut ListNode<T> {
        let n = (*node).next;
        if n == self.tail {
            ptr::null_mut()
        } else {
            n
        }
    }

    /// Unlinks a node from the chain without touching the allocation.
    ///
    /// # Safety
    ///
    /// `node` must be a valid, linked, non-sigil node of this list.
    unsafe fn detach(&mut self, node: *mut ListNode<T>) {
        // SAFETY: a linked node has valid prev and next pointers.
        (*(*node).prev).next = (*node).next;
        (*(*node).next).prev = (*node).prev;
    }

    /// Links an unlinked node in directly after `mark` (on the back side).
    ///
    /// # Safety
    ///
    /// `node` must be valid and not linked into any list; `mark` must be a
    /// linked node or the head sigil of this list.
    unsafe fn attach_after(&mut self, node: *mut ListNode<T>, mark: *mut ListNode<T>) {
        (*node).next = (*mark).next;
        (*node).prev = mark;
        (*(*mark).next).prev = node;
        (*mark).next = node;
    }

    /// Adds a value at the front of the list and returns its node.
    pub fn push_front(&mut self, v: T) -> *mut ListNode<T> {
        // SAFETY: Box::into_raw never returns null.
        let node = unsafe { NonNull::new_unchecked(Box::into_raw(Box::new(ListNode::new(v)))) };
        // SAFETY: node is freshly allocated and not part of any list yet.
        unsafe { self.attach_after(node.as_ptr(), self.head) };
        self.len += 1;
        node.as_ptr()
    }

    /// Inserts a value directly after `mark` (towards the back) and returns
    /// the new node.
    ///
    /// # Safety
    ///
    /// `mark` must be a valid node currently linked into this list.
    pub unsafe fn insert_after(&mut self, mark: *mut ListNode<T>, v: T) -> *mut ListNode<T> {
        let node = NonNull::new_unchecked(Box::into_raw(Box::new(ListNode::new(v))));
        self.attach_after(node.as_ptr(), mark);
        self.len += 1;
        node.as_ptr()
    }

    /// Removes a node and returns its value.
    ///
    /// # Safety
    ///
    /// `node` must be a valid, linked, non-sigil node of this list. Any
    /// outside pointer to the node (hands, the key index) must be repaired
    /// or dropped by the caller before the call.
    pub unsafe fn remove(&mut self, node: *mut ListNode<T>) -> T {
        self.detach(node);
        self.len -= 1;
        Box::from_raw(node).into_value()
    }

    /// Removes the back (oldest) node and returns its value, or None if the
    /// list is empty.
    pub fn pop_back(&mut self) -> Option<T> {
        let node = self.back();
        if node.is_null() {
            return None;
        }
        // SAFETY: back() returned a linked non-sigil node.
        Some(unsafe { self.remove(node) })
    }

    /// Moves a node to the front of the list.
    ///
    /// # Safety
    ///
    /// `node` must be a valid node currently linked into this list.
    pub unsafe fn move_to_front(&mut self, node: *mut ListNode<T>) {
        if (*self.head).next == node {
            return;
        }
        self.detach(node);
        self.attach_after(node, self.head);
    }

    /// Moves a node directly after `mark` (towards the back). No-op when
    /// the node is its own anchor.
    ///
    /// # Safety
    ///
    /// `node` and `mark` must both be valid nodes currently linked into
    /// this list.
    pub unsafe fn move_after(&mut self, node: *mut ListNode<T>, mark: *mut ListNode<T>) {
        if node == mark || (*mark).next == node {
            return;
        }
        self.detach(node);
        self.attach_after(node, mark);
    }

    /// Unlinks a node from this list without deallocating it, so it can be
    /// re-linked into another list. The caller owns the node afterwards.
    ///
    /// # Safety
    ///
    /// `node` must be a valid, linked, non-sigil node of this list.
    pub unsafe fn unlink(&mut self, node: *mut ListNode<T>) {
        self.detach(node);
        self.len -= 1;
    }

    /// Links a node previously `unlink`ed from another list at the front of
    /// this list.
    ///
    /// # Safety
    ///
    /// `node` must be a valid node that is not linked into any list.
    pub unsafe fn link_front(&mut self, node: *mut ListNode<T>) {
        self.attach_after(node, self.head);
        self.len += 1;
    }

    /// Clears the list, dropping all values.
    pub fn clear(&mut self) {
        while self.pop_back().is_some() {}
    }
}

impl<T> Drop for List<T> {
    fn drop(&mut self) {
        self.clear();

        // SAFETY: head and tail were allocated in `new` and are not freed
        // anywhere else; their values are uninitialized sigils so only the
        // node allocations are released here.
        unsafe {
            let _ = Box::from_raw(self.head);
            let _ = Box::from_raw(self.tail);
        }
    }
}

impl<T> Default for List<T> {
    fn default() -> Self {
        List::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for List<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("List").field("length", &self.len).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::String;
    use alloc::vec::Vec;

    /// Collects values back-to-front by walking prev pointers, the way the
    /// eviction hands do.
    fn back_to_front(list: &List<u32>) -> Vec<u32> {
        let mut out = Vec::new();
        let mut node = list.back();
        while !node.is_null() {
            unsafe {
                out.push(*(*node).value());
                node = list.prev(node);
            }
        }
        out
    }

    #[test]
    fn test_new_list_is_empty() {
        let list = List::<u32>::new();
        assert_eq!(list.len(), 0);
        assert!(list.is_empty());
        assert!(list.front().is_null());
        assert!(list.back().is_null());
    }

    #[test]
    fn test_push_front_order() {
        let mut list = List::new();
        list.push_front(10);
        list.push_front(20);
        list.push_front(30);
        assert_eq!(list.len(), 3);
        // back-to-front follows insertion order
        assert_eq!(back_to_front(&list), [10, 20, 30]);
    }

    #[test]
    fn test_insert_after() {
        let mut list = List::new();
        let node1 = list.push_front(10);
        list.push_front(20);
        // insert towards the back of node1 (which is the back node)
        unsafe {
            list.insert_after(node1, 5);
        }
        assert_eq!(back_to_front(&list), [5, 10, 20]);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_remove_and_pop_back() {
        let mut list = List::new();
        let node1 = list.push_front(10);
        list.push_front(20);
        list.push_front(30);

        let v = unsafe { list.remove(node1) };
        assert_eq!(v, 10);
        assert_eq!(list.len(), 2);
        assert_eq!(list.pop_back(), Some(20));
        assert_eq!(list.pop_back(), Some(30));
        assert_eq!(list.pop_back(), None);
    }

    #[test]
    fn test_move_to_front() {
        let mut list = List::new();
        let node1 = list.push_front(10);
        list.push_front(20);
        list.push_front(30);

        unsafe {
            list.move_to_front(node1);
            // moving the front node again is a no-op
            list.move_to_front(node1);
        }
        assert_eq!(back_to_front(&list), [20, 30, 10]);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_move_after() {
        let mut list = List::new();
        let node1 = list.push_front(10);
        list.push_front(20);
        let node3 = list.push_front(30);

        unsafe {
            // move 30 directly behind 10
            list.move_after(node3, node1);
        }
        assert_eq!(back_to_front(&list), [30, 10, 20]);

        unsafe {
            // node as its own anchor is a no-op
            list.move_after(node3, node3);
        }
        assert_eq!(back_to_front(&list), [30, 10, 20]);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_prev_next_stop_at_sigils() {
        let mut list = List::new();
        let node1 = list.push_front(10);
        let node2 = list.push_front(20);

        unsafe {
            assert_eq!(list.prev(node1), node2);
            assert!(list.prev(node2).is_null());
            assert_eq!(list.next(node2), node1);
            assert!(list.next(node1).is_null());
        }
    }

    #[test]
    fn test_unlink_and_link_front_across_lists() {
        let mut list1 = List::new();
        let mut list2 = List::new();
        let node = list1.push_front(10);
        list1.push_front(20);

        unsafe {
            list1.unlink(node);
            list2.link_front(node);
        }
        assert_eq!(list1.len(), 1);
        assert_eq!(list2.len(), 1);
        assert_eq!(list1.pop_back(), Some(20));
        assert_eq!(list2.pop_back(), Some(10));
    }

    #[test]
    fn test_clear_drops_values() {
        let mut list = List::new();
        list.push_front(String::from("a"));
        list.push_front(String::from("b"));
        list.clear();
        assert!(list.is_empty());
        // usable after clear
        list.push_front(String::from("c"));
        assert_eq!(list.pop_back(), Some(String::from("c")));
    }

    #[test]
    fn test_value_mut_in_place() {
        let mut list = List::new();
        let node = list.push_front(String::from("value"));
        unsafe {
            (*node).value_mut().push_str("_edited");
            assert_eq!((*node).value(), "value_edited");
        }
    }
}
