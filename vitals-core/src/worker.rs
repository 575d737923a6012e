use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SendError, Sender, SyncSender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::error::{Error, ErrorHandler};
use crate::options::ClientOptions;
use crate::packet::PacketBuilder;
use crate::protocol::{render_line, MetricKind, MetricValue};
use crate::transport::Transport;

/// One queued measurement, rendered on the emitter thread.
pub(crate) struct LineItem {
    pub metric: Box<str>,
    pub value: MetricValue,
    pub kind: MetricKind,
    pub tags: Arc<[String]>,
}

enum Task {
    Line(LineItem),
    Flush(SyncSender<()>),
    Shutdown,
}

enum TaskSender {
    Bounded(SyncSender<Task>),
    Unbounded(Sender<Task>),
}

impl TaskSender {
    fn send(&self, task: Task) -> Result<(), SendError<Task>> {
        match self {
            TaskSender::Bounded(sender) => sender.send(task),
            TaskSender::Unbounded(sender) => sender.send(task),
        }
    }
}

/// The single consumer thread between the queue and the transport.
///
/// The thread renders queued measurements into protocol lines and packs
/// them with a [`PacketBuilder`]. Buffered lines go out when a packet
/// fills up, when the queue runs empty and when a flush is requested, so
/// nothing lingers while the system idles.
pub(crate) struct EmitterThread {
    sender: TaskSender,
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl EmitterThread {
    pub fn new(
        options: &ClientOptions,
        transport: Arc<dyn Transport>,
        handler: ErrorHandler,
    ) -> EmitterThread {
        let (sender, receiver): (TaskSender, Receiver<Task>) = match options.queue_size {
            Some(bound) => {
                let (tx, rx) = mpsc::sync_channel(bound);
                (TaskSender::Bounded(tx), rx)
            }
            None => {
                let (tx, rx) = mpsc::channel();
                (TaskSender::Unbounded(tx), rx)
            }
        };

        let mut prefix = options.prefix.clone();
        if !prefix.is_empty() && !prefix.ends_with('.') {
            prefix.push('.');
        }
        let constant_tags = options.constant_tags.rendered();
        let capacity = options.packet_size;

        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_worker = shutdown.clone();
        let handle = thread::Builder::new()
            .name("vitals-emitter".into())
            .spawn(move || {
                let mut packet = PacketBuilder::new(capacity);
                let mut line = String::new();
                let mut send = |bytes: &[u8]| match transport.send_packet(bytes) {
                    Ok(sent) if sent != bytes.len() => handler(&Error::PartialSend {
                        sent,
                        size: bytes.len(),
                    }),
                    Ok(_) => {}
                    Err(err) => handler(&Error::Transport(err)),
                };

                let mut next = receiver.recv().ok();
                while let Some(task) = next.take() {
                    if shutdown_worker.load(Ordering::SeqCst) {
                        return;
                    }
                    match task {
                        Task::Line(item) => {
                            line.clear();
                            render_line(
                                &mut line,
                                &prefix,
                                &item.metric,
                                &item.value,
                                item.kind,
                                &constant_tags,
                                &item.tags,
                            );
                            if let Err(err) = packet.push(line.as_bytes(), &mut send) {
                                handler(&err);
                            }
                        }
                        Task::Flush(ack) => {
                            packet.flush(&mut send);
                            ack.send(()).ok();
                        }
                        Task::Shutdown => {
                            packet.flush(&mut send);
                            return;
                        }
                    }
                    match receiver.try_recv() {
                        Ok(task) => next = Some(task),
                        Err(TryRecvError::Empty) => {
                            packet.flush(&mut send);
                            next = receiver.recv().ok();
                        }
                        Err(TryRecvError::Disconnected) => {
                            packet.flush(&mut send);
                            return;
                        }
                    }
                }
            })
            .ok();

        EmitterThread {
            sender,
            shutdown,
            handle,
        }
    }

    /// Queues one measurement. Blocks only on a full bounded queue.
    pub fn enqueue(&self, item: LineItem) {
        let _ = self.sender.send(Task::Line(item));
    }

    /// Waits until everything queued so far has been handed to the
    /// transport, or until the timeout elapses.
    pub fn flush(&self, timeout: Duration) -> bool {
        let (sender, receiver) = mpsc::sync_channel(1);
        let _ = self.sender.send(Task::Flush(sender));
        receiver.recv_timeout(timeout).is_ok()
    }

    /// Flushes and stops the thread.
    pub fn shutdown(self, timeout: Duration) -> bool {
        self.flush(timeout)
    }
}

impl Drop for EmitterThread {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        let _ = self.sender.send(Task::Shutdown);
        if let Some(handle) = self.handle.take() {
            handle.join().unwrap();
        }
    }
}
