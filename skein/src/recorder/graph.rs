//! GraphViz emission of a captured event log.
//!
//! Every event contributes a CPU-side node (`cn_<uid>`, on its thread's
//! lane) and/or a GPU-side node (`gn_<uid>`, on its queue's lane). The
//! horizontal axis is a chain of plaintext rank keys over the distinct
//! time points, so the renderer lays the capture out left to right in
//! time; causality is drawn as explicit colored edges.
//!
//! All intermediate collections are ordered, so building twice from the
//! same log yields byte-identical text.

use super::event::{SyncEvent, ThreadId, TimePoint, Uid};
use super::RecorderState;
use ash::vk;
use ash::vk::Handle;
use std::collections::BTreeMap;
use std::fmt::Write;

const WHITE: u32 = 0xff_ff_ff;
const BLACK: u32 = 0x00_00_00;
const BLUE: u32 = 0x00_00_ff;
const RED: u32 = 0xff_00_00;
const LIME: u32 = 0x00_ff_00;
const ORANGE: u32 = 0xff_a5_00;
const GOLD: u32 = 0xff_d7_00;
const INDIGO: u32 = 0x4b_00_82;
const SKY_BLUE: u32 = 0x87_ce_eb;
const DARK_GREEN: u32 = 0x00_64_00;
const GAINSBORO: u32 = 0xdc_dc_dc;
const DARK_SLATE_GRAY: u32 = 0x2f_4f_4f;

struct NodeStyle {
    font_size: u32,
    bg: u32,
    label: u32,
}

const SUBMIT_STYLE: NodeStyle = NodeStyle {
    font_size: 10,
    bg: BLUE,
    label: WHITE,
};
const BATCH_STYLE: NodeStyle = NodeStyle {
    font_size: 10,
    bg: DARK_SLATE_GRAY,
    label: GAINSBORO,
};
const FENCE_STYLE: NodeStyle = NodeStyle {
    font_size: 8,
    bg: GOLD,
    label: BLACK,
};
const WAIT_STYLE: NodeStyle = NodeStyle {
    font_size: 10,
    bg: RED,
    label: WHITE,
};
const IMAGE_STYLE: NodeStyle = NodeStyle {
    font_size: 10,
    bg: LIME,
    label: BLACK,
};
const THREAD_ANCHOR_STYLE: NodeStyle = NodeStyle {
    font_size: 10,
    bg: INDIGO,
    label: WHITE,
};
const QUEUE_ANCHOR_STYLE: NodeStyle = NodeStyle {
    font_size: 10,
    bg: DARK_SLATE_GRAY,
    label: GAINSBORO,
};

fn cpu_node(uid: Uid) -> String {
    format!("cn_{}", uid.raw())
}

fn gpu_node(uid: Uid) -> String {
    format!("gn_{}", uid.raw())
}

fn styled(id: &str, label: &str, style: &NodeStyle) -> String {
    format!(
        "{} [label=\"{}\", fontcolor=\"#{:06x}\", fontsize={}, fillcolor=\"#{:06x}\", style=filled];\n",
        id, label, style.label, style.font_size, style.bg
    )
}

struct GraphBuilder {
    /// Node declarations bucketed by time point.
    ranks: BTreeMap<TimePoint, String>,
    /// Every edge declaration, in emission order.
    deps: String,
    /// Last CPU-side node per thread.
    cpu_tails: BTreeMap<ThreadId, Uid>,
    /// Last GPU-side node per queue (keyed by raw handle).
    gpu_tails: BTreeMap<u64, Uid>,
}

impl GraphBuilder {
    fn new() -> GraphBuilder {
        GraphBuilder {
            ranks: BTreeMap::new(),
            deps: String::new(),
            cpu_tails: BTreeMap::new(),
            gpu_tails: BTreeMap::new(),
        }
    }

    fn rank_node(&mut self, time: TimePoint, decl: String) {
        let bucket = self.ranks.entry(time).or_default();
        bucket.push_str("\t\t");
        bucket.push_str(&decl);
    }

    fn cpu_timeline(&mut self, uid: Uid, thread: ThreadId) {
        let from = match self.cpu_tails.get(&thread) {
            Some(&prev) => format!("{}:e", cpu_node(prev)),
            None => format!("tid_{}:e", thread.0),
        };
        let _ = writeln!(
            self.deps,
            "\t{} -> {}:w [color=\"#{:06x}\", style=dotted];",
            from,
            cpu_node(uid),
            SKY_BLUE
        );
        self.cpu_tails.insert(thread, uid);
    }

    fn gpu_timeline(&mut self, uid: Uid, queue: vk::Queue) {
        let from = match self.gpu_tails.get(&queue.as_raw()) {
            Some(&prev) => format!("{}:e", gpu_node(prev)),
            None => format!("queue_{}:e", queue.as_raw()),
        };
        let _ = writeln!(
            self.deps,
            "\t{} -> {}:w [color=\"#{:06x}\", style=dotted];",
            from,
            gpu_node(uid),
            DARK_GREEN
        );
        self.gpu_tails.insert(queue.as_raw(), uid);
    }

    fn semaphore_edge(&mut self, from: Uid, to: Uid) {
        let _ = writeln!(
            self.deps,
            "\t{}:e -> {}:w [color=\"#{:06x}\"];",
            gpu_node(from),
            gpu_node(to),
            ORANGE
        );
    }

    fn swapchain_edge(&mut self, from: Uid, to: Uid) {
        let _ = writeln!(
            self.deps,
            "\t{}:e -> {}:w [color=\"#{:06x}\"];",
            gpu_node(from),
            gpu_node(to),
            LIME
        );
    }

    fn cpu_to_gpu_edge(&mut self, from: Uid, to: Uid) {
        let _ = writeln!(
            self.deps,
            "\t{} -> {} [color=\"#{:06x}\"];",
            cpu_node(from),
            gpu_node(to),
            SKY_BLUE
        );
    }

    fn gpu_to_cpu_edge(&mut self, from: Uid, to: Uid) {
        let _ = writeln!(
            self.deps,
            "\t{} -> {} [color=\"#{:06x}\"];",
            gpu_node(from),
            cpu_node(to),
            RED
        );
    }
}

/// Builds the DOT document for the given recorder state.
pub(crate) fn build(state: &RecorderState) -> String {
    let mut b = GraphBuilder::new();

    for event in &state.log {
        let head = *event.head();
        match event {
            SyncEvent::QueueSubmit(e) => {
                b.rank_node(head.time, styled(&cpu_node(head.uid), "Submit", &SUBMIT_STYLE));
                b.cpu_timeline(head.uid, head.thread);
                for &batch in &e.batches {
                    b.cpu_to_gpu_edge(head.uid, batch);
                }
            }
            SyncEvent::CmdBatch(e) => {
                b.rank_node(head.time, styled(&gpu_node(head.uid), "CmdBatch", &BATCH_STYLE));
                b.gpu_timeline(head.uid, e.queue);
                for &producer in &e.wait_deps {
                    b.semaphore_edge(producer, head.uid);
                }
            }
            SyncEvent::FenceSignal(e) => {
                b.rank_node(head.time, styled(&gpu_node(head.uid), "Fence", &FENCE_STYLE));
                b.gpu_timeline(head.uid, e.queue);
                for &batch in &e.depends_on {
                    b.semaphore_edge(batch, head.uid);
                }
            }
            SyncEvent::QueueWaitIdle(e) => {
                b.rank_node(head.time, styled(&cpu_node(head.uid), "Wait", &WAIT_STYLE));
                b.rank_node(head.time, styled(&gpu_node(head.uid), "Wait", &WAIT_STYLE));
                b.cpu_timeline(head.uid, head.thread);
                b.gpu_timeline(head.uid, e.queue);
                b.gpu_to_cpu_edge(head.uid, head.uid);
            }
            SyncEvent::DeviceWaitIdle(_) => {
                b.rank_node(head.time, styled(&cpu_node(head.uid), "Wait", &WAIT_STYLE));
                b.cpu_timeline(head.uid, head.thread);
            }
            SyncEvent::WaitForFences(e) => {
                b.rank_node(head.time, styled(&cpu_node(head.uid), "Wait", &WAIT_STYLE));
                b.cpu_timeline(head.uid, head.thread);
                for &signal in &e.fence_deps {
                    b.gpu_to_cpu_edge(signal, head.uid);
                }
            }
            SyncEvent::AcquireImage(_) => {
                b.rank_node(head.time, styled(&cpu_node(head.uid), "Acquire", &IMAGE_STYLE));
                b.rank_node(head.time, styled(&gpu_node(head.uid), "Acquire", &IMAGE_STYLE));
                b.cpu_timeline(head.uid, head.thread);
                b.cpu_to_gpu_edge(head.uid, head.uid);
            }
            SyncEvent::QueuePresent(e) => {
                b.rank_node(head.time, styled(&cpu_node(head.uid), "Present", &IMAGE_STYLE));
                b.rank_node(head.time, styled(&gpu_node(head.uid), "Present", &IMAGE_STYLE));
                b.cpu_timeline(head.uid, head.thread);
                b.gpu_timeline(head.uid, e.queue);
                b.cpu_to_gpu_edge(head.uid, head.uid);
                for &producer in &e.wait_deps {
                    b.semaphore_edge(producer, head.uid);
                }
                for &(_, acquire) in &e.swapchains {
                    // gaps in the provenance table are skipped
                    if let Some(acquire) = acquire {
                        b.swapchain_edge(acquire, head.uid);
                    }
                }
            }
        }
    }

    // anchor nodes, in stable order: threads by id, then queues by handle
    let mut rank_names = String::new();
    let mut anchors = Vec::new();
    for &thread in b.cpu_tails.keys() {
        let label = state
            .thread_names
            .get(&thread)
            .cloned()
            .unwrap_or_else(|| format!("Thread_{}", thread.0));
        let id = format!("tid_{}", thread.0);
        rank_names.push_str("\t\t");
        rank_names.push_str(&styled(&id, &label, &THREAD_ANCHOR_STYLE));
        anchors.push(id);
    }
    for &raw in b.gpu_tails.keys() {
        let queue = vk::Queue::from_raw(raw);
        let label = state
            .queues
            .get(&queue)
            .map(|q| q.name.clone())
            .unwrap_or_else(|| raw.to_string());
        let id = format!("queue_{}", raw);
        rank_names.push_str("\t\t");
        rank_names.push_str(&styled(&id, &label, &QUEUE_ANCHOR_STYLE));
        anchors.push(id);
    }

    let mut anchor_chain = String::new();
    for pair in anchors.windows(2) {
        let _ = writeln!(
            anchor_chain,
            "\t\t{} -> {} [style=invis, minlen=0];",
            pair[0], pair[1]
        );
    }

    let mut rank_decl = String::from("\"init\"");
    for time in b.ranks.keys() {
        let _ = write!(rank_decl, " -> \"{}\"", time.0);
    }

    let mut out = String::new();
    out.push_str("digraph SyncGraph {\n");
    out.push_str("\trankdir = LR;\n");
    out.push_str("\tbgcolor = black;\n");
    out.push_str("\tcompound = true;\n\n");

    out.push_str("\t{\n");
    out.push_str("\t\tnode [shape=plaintext, fontname=\"helvetica\", fontsize=5, fontcolor=white];\n");
    let _ = writeln!(out, "\t\t{};", rank_decl);
    out.push_str("\t}\n\n");

    out.push_str("\t{\n");
    out.push_str("\t\trank = same; \"init\";\n");
    out.push_str("\t\tnode [shape=rectangle, fontname=\"helvetica\", penwidth=0.0];\n");
    out.push_str("\t\tedge [fontname=\"helvetica\", fontcolor=white, minlen=2];\n");
    out.push_str(&rank_names);
    out.push_str(&anchor_chain);
    out.push_str("\t}\n\n");

    out.push_str("\tnode [shape=rectangle, fontname=\"helvetica\", penwidth=0.0];\n");
    out.push_str("\tedge [fontname=\"helvetica\", fontcolor=white, minlen=2];\n");
    for (time, nodes) in &b.ranks {
        let _ = writeln!(out, "\t{{\n\t\trank = same; \"{}\";", time.0);
        out.push_str(nodes);
        out.push_str("\t}\n");
    }
    out.push('\n');

    out.push_str(&b.deps);
    out.push_str("}\n");
    out
}
