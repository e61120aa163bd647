//! Glues `codec` + `transport` together: sending and receiving a whole
//! serialized CT node as the four-message sequence spec.md S6 describes.

use crate::codec::{self, SerializedNode};
use crate::highlevel::HighLevelNode;
use crate::transport::{AsyncSendPool, Payload, PeerLink, Tag};

/// Sends `node` to `dest` as header, cost, and (when non-empty) path and
/// constraint payloads, all via the pool so the caller's buffers can be
/// reused the instant this returns.
pub async fn send_node(
    pool: &mut AsyncSendPool,
    link: &PeerLink,
    dest: usize,
    tag: Tag,
    node: &HighLevelNode,
    aux_value: i64,
) {
    let wire = codec::encode(node, aux_value);

    pool.send_async(link, dest, tag, Payload::Header(wire.header)).await;
    pool.send_async(link, dest, tag, Payload::Cost(wire.cost)).await;
    if !wire.path_ints.is_empty() {
        pool.send_async(link, dest, tag, Payload::Ints(wire.path_ints)).await;
    }
    if !wire.constraint_ints.is_empty() {
        pool.send_async(link, dest, tag, Payload::Ints(wire.constraint_ints)).await;
    }
}

/// Blocking receive of one serialized node from any source: used when the
/// caller has no outstanding exchange to pin to yet (the header itself is
/// what reveals the source for the rest of the sequence).
pub async fn recv_node(link: &mut PeerLink) -> Option<HighLevelNode> {
    let header_msg = link.recv().await?;
    Some(recv_node_given_header(link, header_msg).await)
}

/// Blocking receive of one serialized node, pinned to `source` for the
/// header as well as the trailing parts. Used when a prior message (e.g.
/// a `TAG_CHILDREN` count) already identifies which sender the rest of
/// the sequence must come from.
pub async fn recv_node_from(link: &mut PeerLink, source: usize) -> Option<HighLevelNode> {
    let header_msg = link.recv_from(source).await?;
    Some(recv_node_given_header(link, header_msg).await)
}

/// Finishes receiving a node whose header message was already obtained via
/// a non-blocking probe (`PeerLink::try_recv`); the remaining parts are
/// read with blocking receives since they are guaranteed to follow on the
/// same FIFO source/destination channel.
pub async fn recv_node_given_header(
    link: &mut PeerLink,
    header_msg: crate::transport::Message,
) -> HighLevelNode {
    let (node, _aux) = recv_node_given_header_with_aux(link, header_msg).await;
    node
}

/// Same as `recv_node_given_header`, but also surfaces the header's
/// `aux_value` field (the incumbent cost a worker prunes new children
/// against, per spec.md S4.5).
///
/// The cost/path/constraint parts are received pinned to `header_msg`'s
/// sender: the shared inbox interleaves traffic from every other rank
/// (another worker's reply, a decentralized peer's reduction-round
/// broadcast), so a plain `link.recv()` here would occasionally decode a
/// stranger's message as the next part of this node.
pub async fn recv_node_given_header_with_aux(
    link: &mut PeerLink,
    header_msg: crate::transport::Message,
) -> (HighLevelNode, i64) {
    let source = header_msg.source;
    let header = match header_msg.payload {
        Payload::Header(h) => h,
        other => panic!("expected a node header, got {other:?}"),
    };

    let cost_msg = link.recv_from(source).await.expect("sender closed mid-node");
    let cost = match cost_msg.payload {
        Payload::Cost(c) => c,
        _ => panic!("expected a cost payload, got {:?}", cost_msg.payload),
    };

    let path_ints = if header[5] > 0 {
        match link.recv_from(source).await.expect("sender closed mid-node").payload {
            Payload::Ints(v) => v,
            other => panic!("expected path ints, got {other:?}"),
        }
    } else {
        Vec::new()
    };

    let constraint_ints = if header[6] > 0 {
        match link.recv_from(source).await.expect("sender closed mid-node").payload {
            Payload::Ints(v) => v,
            other => panic!("expected constraint ints, got {other:?}"),
        }
    } else {
        Vec::new()
    };

    let aux_value = header[7];
    let serialized = SerializedNode {
        header,
        cost,
        path_ints,
        constraint_ints,
    };
    (codec::decode(&serialized), aux_value)
}

pub async fn send_children(
    pool: &mut AsyncSendPool,
    link: &PeerLink,
    dest: usize,
    children: &[HighLevelNode],
    parent_id: u64,
) {
    pool.send_async(link, dest, Tag::Children, Payload::Count(children.len() as i64))
        .await;
    for child in children {
        send_node(pool, link, dest, Tag::Children, child, parent_id as i64).await;
    }
}

/// Receives the `TAG_CHILDREN` count prefix from any source, then the
/// nodes that follow it pinned to that same sender.
pub async fn recv_children(link: &mut PeerLink) -> Option<Vec<HighLevelNode>> {
    let count_msg = link.recv().await?;
    Some(recv_children_given_count(link, count_msg).await)
}

/// Finishes receiving a `TAG_CHILDREN` reply whose count-prefix message was
/// already obtained via a non-blocking probe. Every node in the sequence
/// is pinned to `count_msg`'s sender for the same reason
/// `recv_node_given_header_with_aux` pins its trailing parts: the shared
/// inbox may interleave a different worker's reply between two of this
/// reply's nodes.
pub async fn recv_children_given_count(
    link: &mut PeerLink,
    count_msg: crate::transport::Message,
) -> Vec<HighLevelNode> {
    let source = count_msg.source;
    let count = match count_msg.payload {
        Payload::Count(n) => n as usize,
        other => panic!("expected a children count, got {other:?}"),
    };

    let mut children = Vec::with_capacity(count);
    for _ in 0..count {
        children.push(
            recv_node_from(link, source)
                .await
                .expect("sender closed mid-children"),
        );
    }
    children
}
