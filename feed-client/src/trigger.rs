/// Решает, когда загружать следующую страницу ленты.
///
/// Машина состояний над видимостью «сторожевого» элемента после последней
/// публикации. Срабатывает не более одного раза на переход
/// невидим → видим и никогда — пока идёт загрузка или страницы закончились.
///
/// После каждого рендера сторожевой элемент пересоздаётся; владелец обязан
/// вызвать [`PaginationTrigger::rearm`], чтобы следующий отчёт о видимости
/// снова считался свежим переходом (иначе сторож, оставшийся на экране на
/// время загрузки, не дотянул бы следующую страницу).
#[derive(Debug, Default)]
pub struct PaginationTrigger {
    sentinel_visible: bool,
}

impl PaginationTrigger {
    /// Новый триггер: сторож считается невидимым.
    pub fn new() -> Self {
        Self::default()
    }

    /// Обрабатывает отчёт о видимости сторожа.
    ///
    /// Возвращает `true`, если владельцу пора вызвать загрузку следующей
    /// страницы.
    pub fn on_visibility(&mut self, visible: bool, is_loading: bool, has_more: bool) -> bool {
        let was_visible = self.sentinel_visible;
        self.sentinel_visible = visible;

        visible && !was_visible && !is_loading && has_more
    }

    /// Сбрасывает детектор перехода после замены сторожевого элемента.
    pub fn rearm(&mut self) {
        self.sentinel_visible = false;
    }
}
