/// Runs `$body` with `$tree` bound to whichever packed layout an `AnyOptimizedTree` holds.
///
/// Every arm expands the same body, so generic code is monomorphized once per layout.
macro_rules! with_optimized_tree {
    ($any:expr, $tree:ident => $body:expr) => {
        match $any {
            $crate::physics::trees::optimized_tree::AnyOptimizedTree::Collision($tree) => $body,
            $crate::physics::trees::optimized_tree::AnyOptimizedTree::NoLeaf($tree) => $body,
            $crate::physics::trees::optimized_tree::AnyOptimizedTree::Quantized($tree) => $body,
            $crate::physics::trees::optimized_tree::AnyOptimizedTree::QuantizedNoLeaf($tree) => {
                $body
            }
        }
    };
}

/// Flag accessors shared by every collider. The collider must hold its
/// `ColliderBase` in a field named `base`.
macro_rules! impl_collider_flags {
    ($collider:ty) => {
        impl $collider {
            /// Stop the query at the first reported primitive.
            #[inline(always)]
            pub fn set_first_contact(&mut self, first_contact: bool) {
                self.base.flags.first_contact = first_contact;
            }

            /// Let the query reuse the cache it is handed.
            #[inline(always)]
            pub fn set_temporal_coherence(&mut self, temporal_coherence: bool) {
                self.base.flags.temporal_coherence = temporal_coherence;
            }

            #[inline(always)]
            pub fn set_primitive_tests(&mut self, primitive_tests: bool) {
                self.base.flags.primitive_tests = primitive_tests;
            }

            #[inline(always)]
            pub fn flags(&self) -> $crate::physics::collision_detection::collider::ColliderFlags {
                self.base.flags
            }

            #[inline(always)]
            pub fn first_contact(&self) -> bool {
                self.base.flags.first_contact
            }

            #[inline(always)]
            pub fn temporal_coherence(&self) -> bool {
                self.base.flags.temporal_coherence
            }

            #[inline(always)]
            pub fn primitive_tests(&self) -> bool {
                self.base.flags.primitive_tests
            }

            /// Whether the last query touched anything.
            #[inline(always)]
            pub fn contact_status(&self) -> bool {
                self.base.contact
            }

            /// Counters of the last query.
            #[inline(always)]
            pub fn stats(&self) -> $crate::physics::collision_detection::collider::QueryStats {
                self.base.stats
            }
        }
    };
}
