//! Queued event delivery.
//!
//! Layers never call their listeners directly: [`LayerCore::fire`] only
//! queues. [`flush_events`] delivers queued events in global firing order,
//! one at a time, with no layer borrowed while a listener runs.
//!
//! [`LayerCore::fire`]: super::LayerCore::fire

use log::trace;

use super::{same_layer, LayerListener, SharedLayer};
use crate::command::LayerCommand;

/// Run `command` against `root`, then deliver every resulting event.
pub fn execute(root: &SharedLayer, command: &LayerCommand) -> bool {
    let handled = root.borrow_mut().do_command(command);
    if !handled {
        trace!("command not handled: {command:?}");
    }
    flush_events(root);
    handled
}

/// Deliver pending events of all layers reachable from `root` until none remain.
///
/// Layers below `root` are found through `underlying_layers`; layers above
/// are picked up as they receive events.
pub fn flush_events(root: &SharedLayer) {
    let mut known: Vec<SharedLayer> = Vec::new();
    collect_layers(root, &mut known);

    while let Some(source) = next_source(&known) {
        let (source_id, event, listeners) = {
            let mut layer = source.borrow_mut();
            let Some(event) = layer.core_mut().pop_pending() else {
                continue;
            };
            (layer.id(), event, layer.core().listeners().to_vec())
        };
        trace!("delivering {event:?} from {source_id:?} to {} listeners", listeners.len());

        for listener in listeners {
            match listener {
                LayerListener::Layer(weak) => {
                    let Some(target) = weak.upgrade() else {
                        continue;
                    };
                    target.borrow_mut().handle_layer_event(source_id, &event);
                    collect_layers(&target, &mut known);
                }
                LayerListener::Observer(observer) => observer(&event),
            }
        }
    }
}

/// The known layer holding the earliest queued event.
fn next_source(known: &[SharedLayer]) -> Option<SharedLayer> {
    known
        .iter()
        .filter_map(|layer| {
            let seq = layer.try_borrow().ok()?.core().next_pending_seq()?;
            Some((seq, layer))
        })
        .min_by_key(|(seq, _)| *seq)
        .map(|(_, layer)| SharedLayer::clone(layer))
}

fn collect_layers(layer: &SharedLayer, known: &mut Vec<SharedLayer>) {
    if known.iter().any(|k| same_layer(k, layer)) {
        return;
    }
    known.push(SharedLayer::clone(layer));
    let underlying = layer.borrow().underlying_layers();
    for child in &underlying {
        collect_layers(child, known);
    }
}
