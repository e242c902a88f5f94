//! Shared fixtures for unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use ahash::AHashSet;
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::error::ShardLoadError;
use crate::loader::{MemoryTransport, ShardTransport, TransportLoader};
use crate::query::config::SearchConfig;
use crate::query::engine::QueryEngine;
use crate::shard::partition::SectionPartitioner;
use crate::store::ShardStore;

pub(crate) const SEARCHDATA: &str = r#"
var indexSectionsWithContent =
{
  0: "_abcdefghiklmnoprstuv~",
  1: "_abcdefgiklmnoprsuv~"
};

var indexSectionNames =
{
  0: "all",
  1: "functions"
};

var indexSectionLabels =
{
  0: "All",
  1: "Functions"
};
"#;

/// `s` shard of the `all` section.
pub(crate) const ALL_S: &str = "var searchData=
[
  ['self_0',['self',['../structtstl_1_1deque__iterator.html#a2147',1,'tstl::deque_iterator::self()'],['../structtstl_1_1list__iterator.html#a9fcd',1,'tstl::list_iterator::self()']]],
  ['size_2',['size',['../clasststl_1_1vector.html#a1b82',1,'tstl::vector::size()'],['../clasststl_1_1stack.html#a6c59',1,'tstl::stack::size()'],['../clasststl_1_1deque.html#abd7e',1,'tstl::deque::size()']]],
  ['size_5ftype_3',['size_type',['../clasststl_1_1vector.html#abed8',1,'tstl::vector::size_type()'],['../clasststl_1_1stack.html#aabc3',1,'tstl::stack::size_type()']]],
  ['sort_4',['sort',['../namespacetstl.html#ae56c',1,'tstl::sort()'],['../clasststl_1_1list.html#a2c9e',1,'tstl::list::sort()']]],
  ['swap_8',['swap',['../clasststl_1_1vector.html#a8a34',1,'tstl::vector::swap()'],['../namespacetstl.html#a78cd',1,'tstl::swap(T &amp;a, T &amp;b)']]]
];
";

/// `i` shard of the `all` section.
pub(crate) const ALL_I: &str = "var searchData=
[
  ['insert_1',['insert',['../clasststl_1_1deque.html#afd73',1,'tstl::deque::insert()']]],
  ['iter_5fswap_8',['iter_swap',['../namespacetstl.html#a117f',1,'tstl']]]
];
";

/// `s` shard of the `functions` section. Repeats one `swap` target from
/// `ALL_S` and adds one of its own.
pub(crate) const FUNCTIONS_S: &str = "var searchData=
[
  ['swap_3',['swap',['../clasststl_1_1vector.html#a8a34',1,'tstl::vector::swap()'],['../clasststl_1_1deque.html#ab6a4',1,'tstl::deque::swap()']]]
];
";

/// Memory transport that counts fetches and can hold chosen shards until
/// released.
#[derive(Debug, Default)]
pub(crate) struct GatedTransport {
    inner: MemoryTransport,
    fetches: AtomicUsize,
    gated: Mutex<AHashSet<String>>,
    gate: Notify,
}

impl GatedTransport {
    pub(crate) fn new(inner: MemoryTransport) -> Self {
        Self {
            inner,
            ..Default::default()
        }
    }

    pub(crate) fn gate(self, shard_id: &str) -> Self {
        self.gated.lock().insert(shard_id.to_string());
        self
    }

    pub(crate) fn release(&self) {
        self.gated.lock().clear();
        self.gate.notify_waiters();
    }

    pub(crate) fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ShardTransport for GatedTransport {
    async fn fetch(&self, shard_id: &str) -> Result<Vec<u8>, ShardLoadError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let released = self.gate.notified();
        if self.gated.lock().contains(shard_id) {
            released.await;
        }
        self.inner.fetch(shard_id).await
    }
}

/// Transport preloaded with the fixture shards.
pub(crate) fn fixture_transport() -> MemoryTransport {
    let transport = MemoryTransport::new();
    transport.insert("all_11", ALL_S);
    transport.insert("all_9", ALL_I);
    transport.insert("functions_10", FUNCTIONS_S);
    transport
}

pub(crate) fn store_over(transport: Arc<GatedTransport>) -> Arc<ShardStore> {
    Arc::new(ShardStore::new(Arc::new(TransportLoader::new(transport))))
}

pub(crate) fn engine_over(transport: Arc<GatedTransport>, config: SearchConfig) -> QueryEngine {
    let partitioner = SectionPartitioner::from_searchdata(SEARCHDATA).expect("fixture index parses");
    QueryEngine::new(config, Arc::new(partitioner), store_over(transport))
        .expect("fixture config is valid")
}
