use rand::seq::SliceRandom;
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use tracing::{debug, info};

use super::track::Track;

/// Cola de reproducción de una guild.
///
/// No es thread-safe por sí misma: el lock vive en la sesión dueña y todas
/// las operaciones se ejecutan con ese lock tomado.
#[derive(Debug)]
pub struct MusicQueue {
    items: VecDeque<Track>,
    max_size: usize,
}

impl MusicQueue {
    pub fn new(max_size: usize) -> Self {
        Self {
            items: VecDeque::new(),
            max_size,
        }
    }

    /// Agrega varios tracks al final en su orden original (expansión de
    /// playlist). Devuelve cuántos entraron; sin espacio, el resto se
    /// descarta.
    pub fn push_many(&mut self, tracks: Vec<Track>) -> usize {
        let available = self.max_size.saturating_sub(self.items.len());
        let to_add = tracks.len().min(available);

        for track in tracks.into_iter().take(to_add) {
            self.items.push_back(track);
        }

        if to_add > 0 {
            info!("➕ Agregadas {} canciones a la cola", to_add);
        }
        to_add
    }

    /// Saca el primer elemento (avance de reproducción, FIFO estricto).
    pub fn pop(&mut self) -> Option<Track> {
        self.items.pop_front()
    }

    /// Reinserta al final un track que terminó, para la rotación del loop de
    /// cola. Exento del límite de capacidad: la rotación no puede fallar.
    pub fn requeue(&mut self, track: Track) {
        debug!("🔁 Track devuelto al final de la cola: {}", track.title);
        self.items.push_back(track);
    }

    /// Devuelve el head a su lugar cuando el nodo rechazó arrancarlo.
    pub fn restore_front(&mut self, track: Track) {
        self.items.push_front(track);
    }

    /// Permutación uniforme del contenido actual. El track en reproducción
    /// no vive en la cola, así que nunca se ve afectado.
    pub fn shuffle(&mut self) {
        let mut items: Vec<_> = self.items.drain(..).collect();
        items.shuffle(&mut rand::thread_rng());
        self.items.extend(items);
        info!("🔀 Cola mezclada ({} tracks)", self.items.len());
    }

    /// Vacía la cola. Devuelve cuántos se eliminaron.
    pub fn clear(&mut self) -> usize {
        let removed = self.items.len();
        self.items.clear();
        if removed > 0 {
            info!("🗑️ Cola limpiada: {} tracks", removed);
        }
        removed
    }

    /// Conserva la primera aparición de cada identificador de video y
    /// elimina las repeticiones posteriores, preservando el orden relativo
    /// de los sobrevivientes.
    pub fn remove_duplicates(&mut self) -> usize {
        let mut seen = HashSet::new();
        let original_len = self.items.len();

        self.items.retain(|track| seen.insert(track.id.clone()));

        let removed = original_len - self.items.len();
        if removed > 0 {
            info!("🗑️ Eliminados {} duplicados", removed);
        }
        removed
    }

    /// Copia de solo lectura para mostrar la cola.
    pub fn snapshot(&self) -> Vec<Track> {
        self.items.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total_duration(&self) -> Duration {
        self.items.iter().map(|track| track.duration).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serenity::model::id::UserId;
    use std::collections::HashMap;

    fn track(id: &str) -> Track {
        Track::new(
            id.to_string(),
            format!("Track {id}"),
            format!("https://youtu.be/{id}"),
            Duration::from_secs(180),
            UserId::new(1),
        )
    }

    fn ids(queue: &MusicQueue) -> Vec<String> {
        queue.snapshot().into_iter().map(|t| t.id).collect()
    }

    #[test]
    fn test_push_many_respects_capacity() {
        let mut queue = MusicQueue::new(3);
        let added = queue.push_many(vec![track("a"), track("b"), track("c"), track("d")]);
        assert_eq!(added, 3);
        assert_eq!(ids(&queue), vec!["a", "b", "c"]);

        assert_eq!(queue.push_many(vec![track("e")]), 0);
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn test_pop_is_fifo() {
        let mut queue = MusicQueue::new(10);
        queue.push_many(vec![track("a"), track("b")]);
        assert_eq!(queue.pop().map(|t| t.id), Some("a".to_string()));
        assert_eq!(queue.pop().map(|t| t.id), Some("b".to_string()));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn test_requeue_bypasses_capacity() {
        let mut queue = MusicQueue::new(1);
        queue.push_many(vec![track("a")]);
        queue.requeue(track("b"));
        assert_eq!(ids(&queue), vec!["a", "b"]);
    }

    #[test]
    fn test_remove_duplicates_keeps_first_occurrence_in_order() {
        let mut queue = MusicQueue::new(10);
        queue.push_many(vec![
            track("a"),
            track("b"),
            track("a"),
            track("c"),
            track("b"),
            track("a"),
        ]);

        let removed = queue.remove_duplicates();

        assert_eq!(removed, 3);
        assert_eq!(ids(&queue), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_remove_duplicates_compares_by_id_not_title() {
        let mut queue = MusicQueue::new(10);
        let mut renamed = track("a");
        renamed.title = "Otro título".to_string();
        queue.push_many(vec![track("a"), renamed]);

        assert_eq!(queue.remove_duplicates(), 1);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_shuffle_preserves_track_set() {
        let mut queue = MusicQueue::new(10);
        queue.push_many(vec![track("a"), track("b"), track("c"), track("d")]);

        queue.shuffle();

        let mut after = ids(&queue);
        after.sort();
        assert_eq!(after, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_shuffle_is_statistically_uniform() {
        // 3 elementos → 6 permutaciones. Con 6000 corridas cada una espera
        // ~1000 apariciones; el margen 800..1200 está a más de 5 sigmas.
        let mut counts: HashMap<Vec<String>, u32> = HashMap::new();

        for _ in 0..6000 {
            let mut queue = MusicQueue::new(10);
            queue.push_many(vec![track("a"), track("b"), track("c")]);
            queue.shuffle();
            *counts.entry(ids(&queue)).or_default() += 1;
        }

        assert_eq!(counts.len(), 6);
        for (permutation, count) in counts {
            assert!(
                (800..1200).contains(&count),
                "permutación {permutation:?} apareció {count} veces"
            );
        }
    }

    #[test]
    fn test_clear_empties_queue() {
        let mut queue = MusicQueue::new(10);
        queue.push_many(vec![track("a"), track("b")]);
        assert_eq!(queue.clear(), 2);
        assert!(queue.is_empty());
        assert_eq!(queue.total_duration(), Duration::ZERO);
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let mut queue = MusicQueue::new(10);
        queue.push_many(vec![track("a")]);
        let mut snapshot = queue.snapshot();
        snapshot.clear();
        assert_eq!(queue.len(), 1);
    }
}
