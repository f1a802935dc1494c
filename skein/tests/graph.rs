//! Checks over the emitted GraphViz text: structure, edge colors,
//! anchors, and byte-level idempotence.

use skein::vk::Handle;
use skein::{vk, Analyzer, SyncRecorder};

const DEVICE: u64 = 0xd00d;

fn recorder_with_queue(queue_raw: u64) -> (SyncRecorder, vk::Queue) {
    let _ = tracing_subscriber::fmt::try_init();
    let recorder = SyncRecorder::new();
    let queue = vk::Queue::from_raw(queue_raw);
    recorder.get_device_queue(vk::Device::from_raw(DEVICE), 0, 0, queue);
    recorder.start();
    (recorder, queue)
}

#[test]
fn document_skeleton() {
    let (recorder, queue) = recorder_with_queue(0xa0);
    recorder.queue_submit(
        queue,
        &[vk::SubmitInfo::default()],
        vk::Fence::null(),
        vk::Result::SUCCESS,
    );

    let dot = recorder.dot();
    assert!(dot.starts_with("digraph SyncGraph {\n"));
    assert!(dot.ends_with("}\n"));
    assert!(dot.contains("\trankdir = LR;\n"));
    assert!(dot.contains("\tbgcolor = black;\n"));
    assert!(dot.contains("\"init\" -> \""));
    assert!(dot.contains("rank = same; \"init\";"));
}

#[test]
fn single_submit_edges() {
    let (recorder, queue) = recorder_with_queue(0xa0);
    recorder.queue_submit(
        queue,
        &[vk::SubmitInfo::default()],
        vk::Fence::null(),
        vk::Result::SUCCESS,
    );
    recorder.queue_present(queue, &vk::PresentInfoKHR::default(), vk::Result::SUCCESS);

    let dot = recorder.dot();

    // CPU timeline: anchor -> submit -> present, dotted sky-blue
    assert!(dot.contains("tid_0:e -> cn_2:w [color=\"#87ceeb\", style=dotted];"));
    assert!(dot.contains("cn_2:e -> cn_3:w [color=\"#87ceeb\", style=dotted];"));
    // GPU timeline: anchor -> batch -> present, dotted dark-green
    assert!(dot.contains("queue_160:e -> gn_1:w [color=\"#006400\", style=dotted];"));
    assert!(dot.contains("gn_1:e -> gn_3:w [color=\"#006400\", style=dotted];"));
    // submit and present cross from CPU to GPU in sky-blue
    assert!(dot.contains("cn_2 -> gn_1 [color=\"#87ceeb\"];"));
    assert!(dot.contains("cn_3 -> gn_3 [color=\"#87ceeb\"];"));
    // no semaphores were involved
    assert!(!dot.contains("#ffa500"));
}

#[test]
fn semaphore_and_fence_edges() {
    let (recorder, queue) = recorder_with_queue(0xa0);
    let sem = vk::Semaphore::from_raw(0x51);
    let fence = vk::Fence::from_raw(0xf0);

    let signals = [sem];
    let signal_submit = vk::SubmitInfo {
        signal_semaphore_count: 1,
        p_signal_semaphores: signals.as_ptr(),
        ..Default::default()
    };
    recorder.queue_submit(queue, &[signal_submit], fence, vk::Result::SUCCESS);

    let waits = [sem];
    let wait_submit = vk::SubmitInfo {
        wait_semaphore_count: 1,
        p_wait_semaphores: waits.as_ptr(),
        ..Default::default()
    };
    recorder.queue_submit(queue, &[wait_submit], vk::Fence::null(), vk::Result::SUCCESS);
    recorder.wait_for_fences(
        vk::Device::from_raw(DEVICE),
        &[fence],
        true,
        u64::MAX,
        vk::Result::SUCCESS,
    );

    let dot = recorder.dot();
    // semaphore hand-off: producer batch (1) to consumer batch (4)
    assert!(dot.contains("gn_1:e -> gn_4:w [color=\"#ffa500\"];"));
    // batch to its fence signal (3)
    assert!(dot.contains("gn_1:e -> gn_3:w [color=\"#ffa500\"];"));
    // fence signal to the host wait (6), in red
    assert!(dot.contains("gn_3 -> cn_6 [color=\"#ff0000\"];"));
    // fence node style: gold, black label, small font
    assert!(dot.contains(
        "gn_3 [label=\"Fence\", fontcolor=\"#000000\", fontsize=8, fillcolor=\"#ffd700\", style=filled];"
    ));
    // host wait node: red with white label
    assert!(dot.contains(
        "cn_6 [label=\"Wait\", fontcolor=\"#ffffff\", fontsize=10, fillcolor=\"#ff0000\", style=filled];"
    ));
}

#[test]
fn swapchain_edge_and_gap_skipping() {
    let (recorder, queue) = recorder_with_queue(0xa0);
    let device = vk::Device::from_raw(DEVICE);
    let swapchain = vk::SwapchainKHR::from_raw(0x5c);
    let sem = vk::Semaphore::from_raw(0x52);

    recorder.acquire_next_image(device, swapchain, sem, vk::Fence::null(), 2, vk::Result::SUCCESS);

    let waits = [sem];
    let swapchains = [swapchain, swapchain];
    let indices = [2u32, 0u32]; // index 0 was never acquired
    let present_info = vk::PresentInfoKHR {
        wait_semaphore_count: 1,
        p_wait_semaphores: waits.as_ptr(),
        swapchain_count: 2,
        p_swapchains: swapchains.as_ptr(),
        p_image_indices: indices.as_ptr(),
        ..Default::default()
    };
    recorder.queue_present(queue, &present_info, vk::Result::SUCCESS);

    let dot = recorder.dot();
    // provenance edge acquire (1) -> present (2) in lime
    assert!(dot.contains("gn_1:e -> gn_2:w [color=\"#00ff00\"];"));
    // semaphore edge ends at the same present node
    assert!(dot.contains("gn_1:e -> gn_2:w [color=\"#ffa500\"];"));
    // exactly one lime edge: the unacquired index contributes none
    assert_eq!(dot.matches("[color=\"#00ff00\"];").count(), 1);
}

#[test]
fn queue_wait_idle_self_edge() {
    let (recorder, queue) = recorder_with_queue(0xa0);
    recorder.queue_wait_idle(queue, vk::Result::SUCCESS);

    let dot = recorder.dot();
    assert!(dot.contains("gn_1 -> cn_1 [color=\"#ff0000\"];"));
}

#[test]
fn anchors_and_invisible_chain() {
    let recorder = SyncRecorder::new();
    let device = vk::Device::from_raw(DEVICE);
    let q0 = vk::Queue::from_raw(0xa0);
    let q1 = vk::Queue::from_raw(0xa1);
    recorder.get_device_queue(device, 0, 0, q0);
    recorder.get_device_queue(device, 0, 1, q1);
    recorder.start();

    recorder.queue_submit(
        q0,
        &[vk::SubmitInfo::default()],
        vk::Fence::null(),
        vk::Result::SUCCESS,
    );
    recorder.queue_submit(
        q1,
        &[vk::SubmitInfo::default()],
        vk::Fence::null(),
        vk::Result::SUCCESS,
    );

    let dot = recorder.dot();
    // one thread anchor and two queue anchors
    assert!(dot.contains("tid_0 ["));
    assert!(dot.contains("queue_160 ["));
    assert!(dot.contains("queue_161 ["));
    // thread anchor style: indigo with white label
    assert!(dot.contains("fillcolor=\"#4b0082\""));
    // anchors are chained invisibly so they stack at the init rank
    assert!(dot.contains("tid_0 -> queue_160 [style=invis, minlen=0];"));
    assert!(dot.contains("queue_160 -> queue_161 [style=invis, minlen=0];"));
    assert_eq!(dot.matches("[style=invis, minlen=0];").count(), 2);
}

#[test]
fn default_and_overridden_queue_names() {
    let (recorder, queue) = recorder_with_queue(0xa0);
    recorder.queue_submit(
        queue,
        &[vk::SubmitInfo::default()],
        vk::Fence::null(),
        vk::Result::SUCCESS,
    );

    // without cached family properties the name falls back to Queue_<i>
    let dot = recorder.dot();
    assert!(dot.contains("queue_160 [label=\"Queue_0\""));

    // a debug-utils name on the queue overrides the default
    let name = std::ffi::CString::new("frame submit queue").unwrap();
    let name_info = vk::DebugUtilsObjectNameInfoEXT {
        object_type: vk::ObjectType::QUEUE,
        object_handle: queue.as_raw(),
        p_object_name: name.as_ptr(),
        ..Default::default()
    };
    recorder.set_debug_utils_object_name(
        vk::Device::from_raw(DEVICE),
        &name_info,
        vk::Result::SUCCESS,
    );

    let dot = recorder.dot();
    assert!(dot.contains("queue_160 [label=\"frame submit queue\""));
}

#[test]
fn building_twice_is_byte_identical() {
    let (recorder, queue) = recorder_with_queue(0xa0);
    let sem = vk::Semaphore::from_raw(0x51);
    let signals = [sem];
    let submit = vk::SubmitInfo {
        signal_semaphore_count: 1,
        p_signal_semaphores: signals.as_ptr(),
        ..Default::default()
    };
    recorder.queue_submit(queue, &[submit], vk::Fence::from_raw(0xf0), vk::Result::SUCCESS);
    recorder.queue_wait_idle(queue, vk::Result::SUCCESS);
    recorder.queue_present(queue, &vk::PresentInfoKHR::default(), vk::Result::SUCCESS);

    assert_eq!(recorder.dot(), recorder.dot());
}

#[test]
fn empty_capture_still_renders() {
    let recorder = SyncRecorder::new();
    recorder.start();
    let dot = recorder.dot();
    assert!(dot.starts_with("digraph SyncGraph {\n"));
    assert!(dot.contains("\"init\";"));
    assert_eq!(recorder.dot(), dot);
}
